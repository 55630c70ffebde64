//! Domains Command - print a candidate list for the domain availability check

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use venmail_e2e::data::random_domain_list;

use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Debug, Args)]
pub struct DomainsArgs {
    /// Number of candidates
    #[arg(short, long, default_value_t = 10)]
    pub count: usize,
}

#[derive(Serialize)]
struct DomainRow {
    index: usize,
    domain: String,
}

impl TableDisplay for DomainRow {
    fn headers() -> Vec<&'static str> {
        vec!["#", "Domain"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.index.to_string(), self.domain.clone()]
    }
}

pub async fn execute(args: DomainsArgs, format: OutputFormat) -> Result<()> {
    let rows: Vec<DomainRow> = random_domain_list(&mut rand::thread_rng(), args.count)
        .into_iter()
        .enumerate()
        .map(|(i, domain)| DomainRow { index: i + 1, domain })
        .collect();
    print_list(&rows, format);
    Ok(())
}
