//! Human-readable table output.
//!
//! Primary output first, then a labeled error section when any source failed.

use colored::Colorize;
use rich_rust::prelude::*;

use crate::core::aggregate::{AggregatedResults, CrossProviderAggregation};
use crate::core::group_by::ResultGroup;
use crate::core::models::{
    CostResult, CostResultWithErrors, DEFAULT_CURRENCY, RecommendationsResult, ResourceError,
};
use crate::util::format::{format_money, truncate};

/// Widest a free-text column may grow before truncation.
const MAX_TEXT_WIDTH: usize = 48;

/// Render width handed to `rich_rust`; tables never expand to fill it.
const RENDER_WIDTH: usize = 240;

const LEFT: JustifyMethod = JustifyMethod::Left;
const RIGHT: JustifyMethod = JustifyMethod::Right;

/// Build a table from `(header, justify)` pairs, with an optional totals footer.
fn build_table(columns: &[(&str, JustifyMethod)], footer: Option<Vec<String>>, color: bool) -> Table {
    let show_footer = footer.is_some();
    let mut footer = footer.unwrap_or_default().into_iter();
    let columns = columns.iter().map(|(header, justify)| {
        let column = Column::new(*header).justify(*justify).no_wrap();
        match footer.next() {
            Some(cell) if show_footer => column.footer(cell).footer_style(Style::new().bold()),
            _ => column,
        }
    });

    let table = Table::new().with_columns(columns).show_footer(show_footer);
    if color { table } else { table.ascii() }
}

/// Lay the table out as text, with ANSI styling only when `color` is set.
fn table_to_string(table: &Table, color: bool) -> String {
    if !color {
        return table.render_plain(RENDER_WIDTH);
    }
    table
        .render(RENDER_WIDTH)
        .iter()
        .map(|seg| match &seg.style {
            Some(style) => style.render(&seg.text, ColorSystem::TrueColor),
            None => seg.text.to_string(),
        })
        .collect()
}

fn plain_row<I: IntoIterator<Item = String>>(cells: I) -> Row {
    Row::new(cells.into_iter().map(Cell::new).collect())
}

/// Shared currency of a set of amounts, or `None` when they disagree.
fn common_currency<'a>(mut currencies: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let first = currencies.next().unwrap_or(DEFAULT_CURRENCY);
    currencies.all(|c| c == first).then_some(first)
}

/// Render per-row cost results.
#[must_use]
pub fn render_costs(result: &CostResultWithErrors, actual: bool, color: bool) -> String {
    if result.results.is_empty() {
        return append_errors("No resources matched.\n".to_string(), &result.errors, color);
    }

    let amount = |r: &CostResult| if actual { r.total_cost } else { r.monthly };
    let footer = common_currency(result.results.iter().map(|r| r.effective_currency())).map(
        |currency| {
            let total: f64 = result.results.iter().map(amount).sum();
            let hourly: f64 = result.results.iter().map(|r| r.hourly).sum();
            vec![
                "Total".to_string(),
                String::new(),
                String::new(),
                format_money(total, currency),
                format_money(hourly, currency),
                String::new(),
            ]
        },
    );

    let mut table = build_table(
        &[
            ("RESOURCE", LEFT),
            ("TYPE", LEFT),
            ("ADAPTER", LEFT),
            (if actual { "TOTAL" } else { "MONTHLY" }, RIGHT),
            ("HOURLY", RIGHT),
            ("NOTES", LEFT),
        ],
        footer,
        color,
    );

    for row in &result.results {
        let currency = row.effective_currency();
        let adapter = if row.is_placeholder() {
            Cell::new(row.adapter.as_str()).style(Style::new().dim())
        } else {
            Cell::new(row.adapter.as_str())
        };
        table.add_row(Row::new(vec![
            Cell::new(truncate(&row.resource_id, MAX_TEXT_WIDTH)),
            Cell::new(truncate(&row.resource_type, MAX_TEXT_WIDTH)),
            adapter,
            Cell::new(format_money(amount(row), currency)),
            Cell::new(format_money(row.hourly, currency)),
            Cell::new(truncate(&row.notes, MAX_TEXT_WIDTH)),
        ]));
    }

    append_errors(table_to_string(&table, color), &result.errors, color)
}

/// Render grouped rows, one line per group.
#[must_use]
pub fn render_groups(groups: &[ResultGroup], errors: &[ResourceError], color: bool) -> String {
    let mut table = build_table(
        &[("GROUP", LEFT), ("ROWS", RIGHT), ("MONTHLY", RIGHT), ("TOTAL", RIGHT)],
        None,
        color,
    );

    for group in groups {
        let currency = common_currency(group.results.iter().map(|r| r.effective_currency()))
            .unwrap_or(DEFAULT_CURRENCY);
        table.add_row(plain_row([
            truncate(&group.key, MAX_TEXT_WIDTH),
            group.results.len().to_string(),
            format_money(group.total_monthly, currency),
            format_money(group.total_cost, currency),
        ]));
    }

    append_errors(table_to_string(&table, color), errors, color)
}

/// Render the provider/service/adapter rollup.
#[must_use]
pub fn render_summary(aggregated: &AggregatedResults, errors: &[ResourceError], color: bool) -> String {
    let summary = &aggregated.summary;
    let currency = summary.currency.as_str();
    let heading = |text: &str| if color { text.bold().to_string() } else { text.to_string() };

    let mut out = heading("Summary");
    out.push('\n');
    out.push_str(&format!(
        "  Monthly: {}\n  Hourly:  {}\n  Rows:    {}\n",
        format_money(summary.total_monthly, currency),
        format_money(summary.total_hourly, currency),
        aggregated.resources.len()
    ));

    for (title, dimension, buckets) in [
        ("By provider", "PROVIDER", &summary.by_provider),
        ("By service", "SERVICE", &summary.by_service),
        ("By adapter", "ADAPTER", &summary.by_adapter),
    ] {
        out.push('\n');
        out.push_str(&heading(title));
        out.push('\n');
        let mut table = build_table(&[(dimension, LEFT), ("MONTHLY", RIGHT)], None, color);
        for (key, amount) in buckets {
            table.add_row(plain_row([key.clone(), format_money(*amount, currency)]));
        }
        out.push_str(&table_to_string(&table, color));
    }

    append_errors(out, errors, color)
}

/// Render calendar buckets with one column per provider.
#[must_use]
pub fn render_aggregations(
    buckets: &[CrossProviderAggregation],
    errors: &[ResourceError],
    color: bool,
) -> String {
    let mut providers: Vec<&str> = buckets
        .iter()
        .flat_map(|b| b.providers.keys().map(String::as_str))
        .collect();
    providers.sort_unstable();
    providers.dedup();

    let headers: Vec<String> = providers.iter().map(|p| p.to_uppercase()).collect();
    let mut columns = vec![("PERIOD", LEFT)];
    columns.extend(headers.iter().map(|h| (h.as_str(), RIGHT)));
    columns.push(("TOTAL", RIGHT));
    let mut table = build_table(&columns, None, color);

    for bucket in buckets {
        let mut row = vec![bucket.period.clone()];
        row.extend(providers.iter().map(|p| {
            format_money(bucket.providers.get(*p).copied().unwrap_or(0.0), &bucket.currency)
        }));
        row.push(format_money(bucket.total, &bucket.currency));
        table.add_row(plain_row(row));
    }

    append_errors(table_to_string(&table, color), errors, color)
}

/// Render recommendations.
#[must_use]
pub fn render_recommendations(result: &RecommendationsResult, color: bool) -> String {
    if result.recommendations.is_empty() {
        return append_errors("No recommendations.\n".to_string(), &result.errors, color);
    }

    let footer = common_currency(
        result
            .recommendations
            .iter()
            .map(|r| currency_or_default(&r.currency)),
    )
    .map(|currency| {
        vec![
            "Total".to_string(),
            String::new(),
            String::new(),
            format_money(result.total_savings(), currency),
            String::new(),
        ]
    });

    let mut table = build_table(
        &[
            ("RESOURCE", LEFT),
            ("ACTION", LEFT),
            ("ADAPTER", LEFT),
            ("SAVINGS", RIGHT),
            ("DESCRIPTION", LEFT),
        ],
        footer,
        color,
    );

    for rec in &result.recommendations {
        table.add_row(plain_row([
            truncate(&rec.resource_id, MAX_TEXT_WIDTH),
            rec.action_type.label().to_string(),
            rec.adapter.clone(),
            format_money(rec.estimated_savings, currency_or_default(&rec.currency)),
            truncate(&rec.description, MAX_TEXT_WIDTH),
        ]));
    }

    append_errors(table_to_string(&table, color), &result.errors, color)
}

fn currency_or_default(currency: &str) -> &str {
    if currency.is_empty() {
        DEFAULT_CURRENCY
    } else {
        currency
    }
}

/// Append the labeled error section.
fn append_errors(mut out: String, errors: &[ResourceError], color: bool) -> String {
    if errors.is_empty() {
        return out;
    }

    let title = format!("Errors ({})", errors.len());
    out.push('\n');
    if color {
        out.push_str(&title.red().bold().to_string());
    } else {
        out.push_str(&title);
    }
    out.push('\n');
    for err in errors {
        out.push_str(&format!("  - {err}\n"));
    }
    out
}
