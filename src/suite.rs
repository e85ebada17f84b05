use miette::Diagnostic;
use reqwest::Method;
use reqwest::Url;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use serde_json::json;
use thiserror::Error;

use crate::regions::RegionTable;

const ITEM_PATH: &str = "/api/wow/item";
const ITEM_SET_PATH: &str = "/api/wow/item/set";

const THUNDERFURY_ITEM_ID: i64 = 19019;
const LIGHT_LEATHER_ITEM_ID: i64 = 2318;
const TEEBU_LONGSWORD_ITEM_ID: i64 = 1728;
const SULFURAS_ITEM_ID: i64 = 17182;
const GAMEMASTER_HOOD_ITEM_ID: i64 = 12064;
const SANGUINE_DAGGER_ITEM_ID: i64 = 110050;
const DEEP_EARTH_SET_ID: i64 = 1060;
const DUNGEON_HEROIC_CONTEXT: &str = "dungeon-heroic";

// A syntactically valid credential that the service will never accept.
const BOGUS_AUTH: &str = "BNET c1fbf21b79c03191d:+3fE0RaKc+PqxN0gi8va5GQC35A=";

/// One expected outcome attached to a test case.
#[derive(Debug, Clone)]
pub enum Assertion {
    Status(u16),
    Header { name: String, expect: String },
    JsonEquals { pointer: String, expect: serde_json::Value },
    JsonContains { pointer: String, needle: String },
    JsonHas(String),
    /// Stands in for the whole expectation list when the request itself
    /// never produced a response.
    RequestFailed,
}

#[derive(Debug, Clone)]
pub struct TestCase {
    pub name: String,
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub assertions: Vec<Assertion>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum SuiteError {
    #[error("Failed to build URL for test `{name}`: {source}")]
    Url {
        name: String,
        source: url::ParseError,
    },

    #[error("Invalid request header for test `{name}`: {source}")]
    Header {
        name: String,
        source: reqwest::header::InvalidHeaderValue,
    },
}

fn endpoint_url(
    region: &str,
    path: &str,
    query: &[(&str, &str)],
    api_key: Option<&str>,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!("http://{region}{path}"))?;

    if !query.is_empty() || api_key.is_some() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
        if let Some(key) = api_key {
            pairs.append_pair("apikey", key);
        }
    }

    Ok(url)
}

fn item_url(
    name: &str,
    region: &str,
    object_id: &str,
    query: &[(&str, &str)],
    api_key: Option<&str>,
) -> Result<Url, SuiteError> {
    endpoint_url(region, &format!("{ITEM_PATH}/{object_id}"), query, api_key).map_err(|source| {
        SuiteError::Url {
            name: name.into(),
            source,
        }
    })
}

fn case(name: &str, method: Method, url: Url, assertions: Vec<Assertion>) -> TestCase {
    TestCase {
        name: name.into(),
        method,
        url,
        headers: HeaderMap::new(),
        assertions,
    }
}

fn status_nok(expected_status: u16) -> Vec<Assertion> {
    vec![
        Assertion::Status(expected_status),
        Assertion::JsonEquals {
            pointer: "/status".into(),
            expect: json!("nok"),
        },
    ]
}

/// Builds the full, ordered list of test cases for one region. The list is
/// fixed apart from the region host, the optional API key and the
/// region/locale combinations taken from the bundled table.
pub fn build_suite(
    region: &str,
    api_key: Option<&str>,
    regions: &RegionTable,
) -> Result<Vec<TestCase>, SuiteError> {
    let mut tests = vec![];

    // The expected case for an individual item
    let name = "individual item";
    tests.push(case(
        name,
        Method::GET,
        item_url(name, region, &THUNDERFURY_ITEM_ID.to_string(), &[], api_key)?,
        vec![
            Assertion::Status(200),
            Assertion::JsonEquals {
                pointer: "/id".into(),
                expect: json!(THUNDERFURY_ITEM_ID),
            },
            Assertion::JsonContains {
                pointer: "/name".into(),
                needle: "Thunderfury".into(),
            },
        ],
    ));

    // An item whose exact name is known and stable
    let name = "known item name";
    tests.push(case(
        name,
        Method::GET,
        item_url(
            name,
            region,
            &LIGHT_LEATHER_ITEM_ID.to_string(),
            &[],
            api_key,
        )?,
        vec![
            Assertion::Status(200),
            Assertion::JsonEquals {
                pointer: "/name".into(),
                expect: json!("Light Leather"),
            },
        ],
    ));

    // Requests using an invalid item ID must return a 404
    for invalid_id in ["", "-1", "magical crawdad"] {
        let name = format!("invalid item id `{invalid_id}`");
        tests.push(case(
            &name,
            Method::GET,
            item_url(&name, region, invalid_id, &[], api_key)?,
            status_nok(404),
        ));
    }

    // Requests to a non-existent route must return a 404
    let name = "invalid endpoint";
    tests.push(case(
        name,
        Method::GET,
        endpoint_url(region, "/api/wow/fake_api_endpoint", &[], api_key).map_err(|source| {
            SuiteError::Url {
                name: name.into(),
                source,
            }
        })?,
        status_nok(404),
    ));

    // You can't just delete Sulfuras, Hand of Ragnaros...
    for method in [Method::DELETE, Method::PUT] {
        let name = format!("invalid method {method}");
        tests.push(case(
            &name,
            method,
            item_url(&name, region, &SULFURAS_ITEM_ID.to_string(), &[], api_key)?,
            status_nok(500),
        ));
    }

    // Requests to a given region must answer in the requested locale
    for (locale_region, locale) in regions.combinations() {
        let name = format!("localization {locale_region} {locale}");
        tests.push(case(
            &name,
            Method::GET,
            item_url(
                &name,
                &locale_region,
                &TEEBU_LONGSWORD_ITEM_ID.to_string(),
                &[("locale", locale.as_str())],
                api_key,
            )?,
            vec![
                Assertion::Status(200),
                Assertion::Header {
                    name: "content-language".into(),
                    expect: locale.replacen('_', "-", 1),
                },
                Assertion::JsonEquals {
                    pointer: "/id".into(),
                    expect: json!(TEEBU_LONGSWORD_ITEM_ID),
                },
            ],
        ));
    }

    // An item set lists its ID, name and member items
    let name = "item set";
    tests.push(case(
        name,
        Method::GET,
        endpoint_url(
            region,
            &format!("{ITEM_SET_PATH}/{DEEP_EARTH_SET_ID}"),
            &[],
            api_key,
        )
        .map_err(|source| SuiteError::Url {
            name: name.into(),
            source,
        })?,
        vec![
            Assertion::Status(200),
            Assertion::JsonEquals {
                pointer: "/id".into(),
                expect: json!(DEEP_EARTH_SET_ID),
            },
            Assertion::JsonHas("/name".into()),
            Assertion::JsonHas("/items".into()),
        ],
    ));

    // Items after patch 6.0 answer a bare request with their available
    // creation contexts only
    let name = "creation context list";
    tests.push(case(
        name,
        Method::GET,
        item_url(
            name,
            region,
            &SANGUINE_DAGGER_ITEM_ID.to_string(),
            &[],
            api_key,
        )?,
        vec![
            Assertion::Status(200),
            Assertion::JsonEquals {
                pointer: "/id".into(),
                expect: json!(SANGUINE_DAGGER_ITEM_ID),
            },
            Assertion::JsonHas("/availableContexts".into()),
        ],
    ));

    // Requesting the item with an explicit context returns that version
    let name = "creation context item";
    tests.push(case(
        name,
        Method::GET,
        item_url(
            name,
            region,
            &format!("{SANGUINE_DAGGER_ITEM_ID}/{DUNGEON_HEROIC_CONTEXT}"),
            &[],
            api_key,
        )?,
        vec![
            Assertion::Status(200),
            Assertion::JsonEquals {
                pointer: "/context".into(),
                expect: json!(DUNGEON_HEROIC_CONTEXT),
            },
        ],
    ));

    // Bonus lists ride along as the `bl` query parameter
    let name = "bonus list";
    tests.push(case(
        name,
        Method::GET,
        item_url(
            name,
            region,
            &format!("{SANGUINE_DAGGER_ITEM_ID}/{DUNGEON_HEROIC_CONTEXT}"),
            &[("bl", "524,499")],
            api_key,
        )?,
        vec![
            Assertion::Status(200),
            Assertion::JsonHas("/bonusLists".into()),
        ],
    ));

    // The anonymous request must succeed before the credential test means
    // anything
    let name = "anonymous request";
    tests.push(case(
        name,
        Method::GET,
        item_url(
            name,
            region,
            &GAMEMASTER_HOOD_ITEM_ID.to_string(),
            &[],
            api_key,
        )?,
        vec![Assertion::Status(200)],
    ));

    // The same request with a bogus Authorization header must be rejected
    let name = "invalid authentication";
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(BOGUS_AUTH).map_err(|source| SuiteError::Header {
            name: name.into(),
            source,
        })?,
    );
    tests.push(TestCase {
        name: name.into(),
        method: Method::GET,
        url: item_url(
            name,
            region,
            &GAMEMASTER_HOOD_ITEM_ID.to_string(),
            &[],
            api_key,
        )?,
        headers,
        assertions: vec![
            Assertion::Status(500),
            Assertion::JsonEquals {
                pointer: "/reason".into(),
                expect: json!("Invalid Application"),
            },
        ],
    });

    Ok(tests)
}
