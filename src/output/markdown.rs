//! Markdown report generation
//!
//! Renders a domain's graph statistics as a markdown document.

use crate::output::stats::GraphStatistics;
use crate::storage::Domain;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown report for a domain to `output_path`
pub fn write_markdown_report(
    domain: &Domain,
    stats: &GraphStatistics,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_report(domain, stats);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a domain's statistics as markdown
pub fn format_markdown_report(domain: &Domain, stats: &GraphStatistics) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Link Graph Report: {}\n\n", domain.url));

    md.push_str("## Domain\n\n");
    md.push_str(&format!("- **Domain ID**: {}\n", domain.id));
    md.push_str(&format!("- **Host**: {}\n", domain.host));
    md.push_str(&format!("- **Registered**: {}\n", domain.created_at.to_rfc3339()));
    if let Some(last) = stats.last_crawled_at {
        md.push_str(&format!("- **Last Crawled**: {}\n", last.to_rfc3339()));
    }
    md.push('\n');

    md.push_str("## Overview\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Total URLs | {} |\n", stats.total_urls));
    md.push_str(&format!("| Crawled | {} |\n", stats.crawled_urls));
    md.push_str(&format!("| Stubs | {} |\n", stats.stub_urls));
    md.push_str(&format!("| Internal Links | {} |\n", stats.total_edges));
    md.push('\n');

    if !stats.pages_by_status.is_empty() {
        md.push_str("## Pages by Status\n\n");
        md.push_str("| Status | Pages |\n");
        md.push_str("|--------|-------|\n");
        for (status, count) in &stats.pages_by_status {
            md.push_str(&format!("| {} | {} |\n", status, count));
        }
        md.push('\n');
    }

    if !stats.broken_targets.is_empty() {
        md.push_str("## Broken Link Targets\n\n");
        for target in &stats.broken_targets {
            md.push_str(&format!(
                "- `{}` ({}), linked from {} page(s)\n",
                target.url, target.status_code, target.inbound_links
            ));
        }
        md.push('\n');
    }

    if !stats.orphan_pages.is_empty() {
        md.push_str("## Orphan Pages\n\n");
        for url in &stats.orphan_pages {
            md.push_str(&format!("- `{}`\n", url));
        }
        md.push('\n');
    }

    md
}
