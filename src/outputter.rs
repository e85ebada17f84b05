use std::sync::Arc;

use console::Style;
use flume::Receiver;

use crate::asserter::AssertResult;
use crate::asserter::TestResult;

pub struct OutPutter;

impl OutPutter {
    /// Prints one progress line per finished test, then either a failure
    /// summary or an all-passed banner. Returns the number of failed tests.
    pub async fn start(
        rx: Receiver<(String, String, String, Arc<[AssertResult]>)>,
        region: &str,
        n_tests: usize,
    ) -> usize {
        let style = Style::new().bold().cyan();
        let open_text = &format!("Running {n_tests} tests against {region}...");
        let open_text = style.apply_to(open_text);

        println!("{open_text}");
        let mut i = 1;
        let mut failed_count = 0;
        let mut failed_tests: Vec<(String, AssertResult)> = vec![];
        while let Ok((name, method, path, results)) = rx.recv_async().await {
            let failures: Vec<AssertResult> = results
                .iter()
                .filter(|r| r.status == TestResult::Fail)
                .cloned()
                .collect();

            if failures.is_empty() {
                println!(
                    "[{i}/{n_tests}] {}  {name} ({method} {path}) {}",
                    console::style("✔").green().bold(),
                    console::style("PASS!").green().bold(),
                );
            } else {
                failed_count += 1;
                println!(
                    "[{i}/{n_tests}] {}  {name} ({method} {path}) {}",
                    console::style("✘").red().bold(),
                    console::style("FAILED!").red().bold(),
                );
                for failure in failures {
                    failed_tests.push((name.clone(), failure));
                }
            }

            i += 1;
        }

        if failed_tests.is_empty() {
            println!();
            println!("{}", console::style("All tests passed! 🎉").bold().green());
        } else {
            println!();
            println!(
                "{}",
                console::style("Summary of Failed Tests:").bold().red()
            );
            for (idx, (name, result)) in failed_tests.iter().enumerate() {
                println!("\n{}. {} {}", idx + 1, name, result);
            }
        }

        failed_count
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use flume::Sender;
    use reqwest::StatusCode;

    use crate::asserter::Actual;
    use crate::asserter::AssertResult;
    use crate::asserter::TestResult;
    use crate::outputter::OutPutter;
    use crate::suite::Assertion;

    async fn send(
        tx: &Sender<(String, String, String, Arc<[AssertResult]>)>,
        name: &str,
        status: TestResult,
    ) {
        let result = AssertResult {
            status,
            expected: Assertion::Status(200),
            actual: Actual::Status(StatusCode::OK),
        };

        tx.send_async((
            name.to_string(),
            "GET".into(),
            "/api/wow/item/2318".into(),
            Arc::from([result]),
        ))
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn counts_failed_tests() {
        let (tx, rx) = flume::unbounded::<(String, String, String, Arc<[AssertResult]>)>();

        send(&tx, "passing", TestResult::Pass).await;
        send(&tx, "failing", TestResult::Fail).await;
        drop(tx);

        let failed = OutPutter::start(rx, "us.battle.net", 2).await;
        assert_eq!(failed, 1);
    }

    #[tokio::test]
    async fn all_passing_returns_zero() {
        let (tx, rx) = flume::unbounded::<(String, String, String, Arc<[AssertResult]>)>();

        send(&tx, "first", TestResult::Pass).await;
        send(&tx, "second", TestResult::Pass).await;
        drop(tx);

        let failed = OutPutter::start(rx, "us.battle.net", 2).await;
        assert_eq!(failed, 0);
    }
}
