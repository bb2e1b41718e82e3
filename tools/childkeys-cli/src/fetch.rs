//! Fetch child keys for every URL on the command line.

use anyhow::{Context, Result};
use childkeys_core::{FetchOptions, KeyFetchError, KeyFetchResult, KeyList, NodeReference};
use childkeys_fetch::{FetchReport, KeyFetcher, TimeoutConfig};
use clap::Args;
use serde::Serialize;

use crate::output::{format_micros, kind_badge, Output};

/// Fetch arguments.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Node URLs, e.g. https://my-db.firebaseio.com/users
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Access token sent as `access_token`
    #[arg(long, conflicts_with = "auth")]
    pub access_token: Option<String>,

    /// Legacy database secret sent as `auth`
    #[arg(long)]
    pub auth: Option<String>,

    /// Maximum attempts per node, including the first
    #[arg(long)]
    pub max_tries: Option<u32>,

    /// Delay between attempts in milliseconds
    #[arg(long)]
    pub retry_interval_ms: Option<u64>,

    /// Per-attempt timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Sort keys
    #[arg(long)]
    pub sort: bool,

    /// Print keys with JSON escapes decoded
    #[arg(long)]
    pub decode: bool,
}

impl FetchArgs {
    /// Layer command line flags over options from the config file.
    pub fn options(&self, mut options: FetchOptions) -> FetchOptions {
        if let Some(max_tries) = self.max_tries {
            options.max_tries = max_tries;
        }
        if let Some(interval) = self.retry_interval_ms {
            options.retry_interval_ms = interval;
        }
        if let Some(timeout) = self.timeout_ms {
            options.timeout_ms = Some(timeout);
        }
        if let Some(token) = &self.access_token {
            options.access_token = Some(token.clone());
            options.auth = None;
        }
        if let Some(secret) = &self.auth {
            options.auth = Some(secret.clone());
            options.access_token = None;
        }
        options
    }

    fn present(&self, keys: KeyList) -> KeyFetchResult<Vec<String>> {
        let keys = if self.sort { keys.sorted() } else { keys };
        if self.decode {
            keys.decoded()
        } else {
            Ok(keys.into_vec())
        }
    }
}

/// One node's result in JSON output.
#[derive(Debug, Serialize)]
struct NodeOutput {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorOutput>,
    attempts: u32,
    duration_us: u64,
}

#[derive(Debug, Serialize)]
struct ErrorOutput {
    kind: &'static str,
    message: String,
}

impl From<&KeyFetchError> for ErrorOutput {
    fn from(error: &KeyFetchError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Fetch all nodes concurrently. Returns whether every fetch succeeded.
pub async fn run(args: &FetchArgs, options: FetchOptions, output: &Output) -> Result<bool> {
    options.validate().context("Invalid fetch options")?;

    let references = args
        .urls
        .iter()
        .map(|url| NodeReference::parse(url).with_context(|| format!("Invalid node URL: {}", url)))
        .collect::<Result<Vec<_>>>()?;

    let timeouts = options
        .timeout()
        .map(TimeoutConfig::from_total)
        .unwrap_or_default();
    let fetcher = KeyFetcher::with_timeouts(timeouts).context("Failed to create HTTP client")?;

    let reports = futures::future::join_all(
        references
            .iter()
            .map(|reference| fetcher.fetch_with_metrics(reference, &options)),
    )
    .await;

    let results: Vec<NodeOutput> = references
        .iter()
        .zip(reports)
        .map(|(reference, report)| node_output(args, reference, report))
        .collect();

    let failed = results.iter().filter(|node| node.error.is_some()).count();

    if output.is_json() {
        output.json(&results);
    } else {
        print_human(&results, output);
        if failed == 0 && results.len() > 1 {
            output.success(&format!("Listed {} nodes", results.len()));
        }
    }

    Ok(failed == 0)
}

fn node_output(args: &FetchArgs, reference: &NodeReference, report: FetchReport) -> NodeOutput {
    let attempts = report.metrics.attempt_count();
    let duration_us = report.metrics.total_duration_us;
    let result = report.result.and_then(|keys| args.present(keys));

    let (keys, error) = match result {
        Ok(keys) => (Some(keys), None),
        Err(error) => (None, Some(ErrorOutput::from(&error))),
    };

    NodeOutput {
        url: reference.to_string(),
        keys,
        error,
        attempts,
        duration_us,
    }
}

fn print_human(results: &[NodeOutput], output: &Output) {
    let many = results.len() > 1;
    for node in results {
        if many {
            output.header(&node.url);
        }
        output.debug(&format!(
            "{} attempt(s) in {}",
            node.attempts,
            format_micros(node.duration_us)
        ));
        match (&node.keys, &node.error) {
            (Some(keys), _) => {
                for key in keys {
                    output.key(key);
                }
            }
            (None, Some(error)) => {
                output.error(&format!(
                    "{} [{}] {}",
                    node.url,
                    kind_badge(error.kind),
                    error.message
                ));
            }
            (None, None) => {}
        }
    }
}
