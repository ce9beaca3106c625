//! Presentation helpers: zero-filled series, template context, terminal text

use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use std::fmt::Write;

use crate::types::{
    Channel, ChannelBreakdown, DailyBucket, DailyCounts, PendingReport, Report, Result,
    VotersSummary, VotetrackError,
};

const BAR_WIDTH: usize = 24;

/// Expand a sparse daily series over `axis`, filling missing days with 0.
/// Days outside the axis are dropped.
pub fn densify(series: &DailyCounts, axis: &[NaiveDate]) -> Vec<DailyBucket> {
    axis.iter()
        .map(|date| DailyBucket {
            date: *date,
            count: series.get(date).copied().unwrap_or(0),
        })
        .collect()
}

/// Format number with thousand separators (e.g., 1234567 → "1,234,567")
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let len = s.len();
    let mut result = String::with_capacity(len + len / 3);

    // Digits are ASCII, so byte indexing is safe
    for (i, ch) in s.bytes().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch as char);
    }

    result
}

/// Format a bar proportional to `value / max`
/// Example: value=500, max=1000, width=8 → "▓▓▓▓░░░░"
pub fn format_bar(value: u64, max: u64, width: usize) -> String {
    if max == 0 || width == 0 {
        return "░".repeat(width);
    }
    let ratio = value as f64 / max as f64;
    let filled = ((ratio * width as f64).round() as usize).min(width);
    format!("{}{}", "▓".repeat(filled), "░".repeat(width - filled))
}

/// Key prefix a channel gets in the template context
fn context_prefix(channel: &Channel) -> &str {
    match channel {
        Channel::User => "web",
        other => other.as_str(),
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| VotetrackError::Parse(e.to_string()))
}

/// Flatten a report into the key/value context the stats page renders.
///
/// Every series is present twice: sparse (`*_per_day`) and zero-filled
/// over the date axis (`*_per_day_dense`).
pub fn template_context(report: &Report) -> Result<Map<String, Value>> {
    let mut ctx = Map::new();
    let totals = &report.totals;

    ctx.insert("users".into(), json!(totals.users));
    ctx.insert("pending_users".into(), json!(totals.pending_users));
    ctx.insert("citizens_voted".into(), json!(totals.citizens_voted));
    ctx.insert(
        "citizens_with_account".into(),
        json!(totals.citizens_with_account),
    );
    ctx.insert(
        "registered_voters_voted".into(),
        json!(totals.registered_voters_voted),
    );

    insert_breakdown(&mut ctx, "total", &report.all, &report.date_axis)?;
    for (channel, breakdown) in &report.channels {
        insert_breakdown(&mut ctx, context_prefix(channel), breakdown, &report.date_axis)?;
    }

    ctx.insert("voters_by_district".into(), to_value(&report.districts)?);
    ctx.insert(
        "voters_by_neighbourhood".into(),
        to_value(&report.neighbourhoods)?,
    );
    ctx.insert("date_axis".into(), to_value(&report.date_axis)?);
    ctx.insert("genders".into(), to_value(&report.genders)?);
    ctx.insert("today".into(), to_value(&report.today)?);
    ctx.insert("last_ballot_at".into(), to_value(&report.last_ballot_at)?);

    Ok(ctx)
}

fn insert_breakdown(
    ctx: &mut Map<String, Value>,
    prefix: &str,
    breakdown: &ChannelBreakdown,
    axis: &[NaiveDate],
) -> Result<()> {
    ctx.insert(format!("ballots_{}", prefix), json!(breakdown.total));
    ctx.insert(format!("{}_per_day", prefix), to_value(&breakdown.per_day)?);
    ctx.insert(
        format!("{}_per_day_dense", prefix),
        to_value(&densify(&breakdown.per_day, axis))?,
    );
    ctx.insert(
        format!("{}_per_gender", prefix),
        to_value(&breakdown.per_gender)?,
    );
    Ok(())
}

/// Terminal summary of a participation report
pub fn render_report(report: &Report) -> String {
    let mut out = String::new();
    let totals = &report.totals;

    let _ = writeln!(
        out,
        "Voting window {} → {} (as of {})",
        report.window.start, report.window.end, report.today
    );
    let _ = writeln!(out);
    let rows = [
        ("Registered users", totals.users),
        ("Pending sign-ups", totals.pending_users),
        ("Citizens who voted", totals.citizens_voted),
        ("Citizens with account", totals.citizens_with_account),
        ("Registered who voted", totals.registered_voters_voted),
        ("Ballots", report.all.total),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "  {:<22} {:>10}", label, format_number(value));
    }
    if let Some(last) = report.last_ballot_at {
        let _ = writeln!(out, "  {:<22} {}", "Last ballot", last.format("%Y-%m-%d %H:%M:%S"));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Ballots by channel");
    let max = report.channels.values().map(|c| c.total).max().unwrap_or(0);
    for (channel, breakdown) in &report.channels {
        let _ = writeln!(
            out,
            "  {:<8} {} {:>8}",
            channel.label(),
            format_bar(breakdown.total, max, BAR_WIDTH),
            format_number(breakdown.total)
        );
    }
    let unclassified = report.unclassified_ballots();
    if unclassified > 0 {
        let _ = writeln!(
            out,
            "  {:<8} {:>width$}",
            "Other",
            format_number(unclassified),
            width = BAR_WIDTH + 9
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Ballots per day");
    render_series(&mut out, &report.all.per_day, &report.date_axis);
    if let Some((date, count)) = report.all.peak_day() {
        let _ = writeln!(out, "  Peak: {} ({})", date, format_number(count));
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Ballots by gender");
    for (gender, count) in &report.all.per_gender {
        let _ = writeln!(out, "  {:<8} {:>8}", gender, format_number(*count));
    }

    if !report.districts.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Turnout by district");
        for row in &report.districts {
            let _ = writeln!(out, "  {:<24} {:>8}", row.district, format_number(row.voters));
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Turnout by neighbourhood");
        for row in &report.neighbourhoods {
            let _ = writeln!(
                out,
                "  {:<24} {:<24} {:>8}",
                row.district,
                row.neighbourhood,
                format_number(row.voters)
            );
        }
    }

    out
}

/// Terminal summary of pending sign-ups
pub fn render_pending(report: &PendingReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  Registered users   {:>10}", format_number(report.users));
    let _ = writeln!(out, "  Pending sign-ups   {:>10}", format_number(report.pending_users));
    let _ = writeln!(out);
    let _ = writeln!(out, "Pending sign-ups per day");
    render_series(&mut out, &report.per_day, &report.date_axis);
    out
}

/// Terminal summary of registered voters
pub fn render_voters(summary: &VotersSummary) -> String {
    let rows = [
        ("Citizens with account", summary.citizens_with_account),
        ("Registered who voted", summary.registered_voters_voted),
        ("Not voted yet", summary.pending),
    ];
    let mut out = String::new();
    for (label, value) in rows {
        let _ = writeln!(out, "  {:<22} {:>10}", label, format_number(value));
    }
    out
}

fn render_series(out: &mut String, series: &DailyCounts, axis: &[NaiveDate]) {
    let buckets = densify(series, axis);
    if buckets.is_empty() {
        let _ = writeln!(out, "  (no days in window)");
        return;
    }
    let max = buckets.iter().map(|b| b.count).max().unwrap_or(0);
    for bucket in buckets {
        let _ = writeln!(
            out,
            "  {} {} {:>8}",
            bucket.date,
            format_bar(bucket.count, max, BAR_WIDTH),
            format_number(bucket.count)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DistrictTurnout, Totals, VotingWindow};
    use std::collections::BTreeMap;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_report() -> Report {
        let mut tablet = ChannelBreakdown::default();
        tablet.total = 2;
        tablet.per_day.insert(d(1), 2);
        tablet.per_gender.insert("F".to_string(), 2);

        let mut web = ChannelBreakdown::default();
        web.total = 1;
        web.per_day.insert(d(2), 1);
        web.per_gender.insert("M".to_string(), 1);

        let mut all = ChannelBreakdown::default();
        all.total = 3;
        all.per_day.insert(d(1), 2);
        all.per_day.insert(d(2), 1);
        all.per_gender.insert("F".to_string(), 2);
        all.per_gender.insert("M".to_string(), 1);

        let mut channels = BTreeMap::new();
        channels.insert(Channel::Tablet, tablet);
        channels.insert(Channel::User, web);
        channels.insert(Channel::Link, ChannelBreakdown::default());
        channels.insert(Channel::Paper, ChannelBreakdown::default());

        Report {
            today: d(3),
            window: VotingWindow::new(d(1), d(5)),
            totals: Totals {
                users: 1500,
                ..Default::default()
            },
            all,
            channels,
            districts: vec![DistrictTurnout {
                district: "Norte".to_string(),
                voters: 3,
            }],
            neighbourhoods: Vec::new(),
            date_axis: vec![d(1), d(2), d(3)],
            genders: vec!["M".to_string(), "F".to_string()],
            last_ballot_at: d(2).and_hms_opt(18, 30, 0),
        }
    }

    // ========== densify tests ==========

    #[test]
    fn test_densify_fills_gaps_with_zero() {
        let mut series = DailyCounts::new();
        series.insert(d(1), 4);
        series.insert(d(3), 1);

        let dense = densify(&series, &[d(1), d(2), d(3)]);
        let counts: Vec<u64> = dense.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![4, 0, 1]);
        assert_eq!(dense[1].date, d(2));
    }

    #[test]
    fn test_densify_drops_days_outside_axis() {
        let mut series = DailyCounts::new();
        series.insert(d(9), 4);

        let dense = densify(&series, &[d(1), d(2)]);
        assert_eq!(dense.len(), 2);
        assert!(dense.iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_densify_empty_axis() {
        assert!(densify(&DailyCounts::new(), &[]).is_empty());
    }

    // ========== formatting tests ==========

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_format_bar() {
        assert_eq!(format_bar(0, 10, 4), "░░░░");
        assert_eq!(format_bar(10, 10, 4), "▓▓▓▓");
        assert_eq!(format_bar(5, 10, 4), "▓▓░░");
        assert_eq!(format_bar(3, 0, 2), "░░");
        assert_eq!(format_bar(20, 10, 4), "▓▓▓▓");
    }

    // ========== template_context tests ==========

    #[test]
    fn test_template_context_keys() {
        let ctx = template_context(&sample_report()).unwrap();

        assert_eq!(ctx["users"], 1500);
        assert_eq!(ctx["ballots_total"], 3);
        assert_eq!(ctx["ballots_tablet"], 2);
        assert_eq!(ctx["ballots_web"], 1);
        assert_eq!(ctx["ballots_link"], 0);
        assert_eq!(ctx["ballots_paper"], 0);
        assert_eq!(ctx["tablet_per_day"]["2024-01-01"], 2);
        assert_eq!(ctx["web_per_gender"]["M"], 1);
        assert_eq!(ctx["voters_by_district"][0]["district"], "Norte");
        assert_eq!(ctx["date_axis"].as_array().unwrap().len(), 3);
        assert_eq!(ctx["genders"][0], "M");
        assert_eq!(ctx["last_ballot_at"], "2024-01-02T18:30:00");
    }

    #[test]
    fn test_template_context_dense_and_sparse_series() {
        let ctx = template_context(&sample_report()).unwrap();

        let sparse = ctx["link_per_day"].as_object().unwrap();
        assert!(sparse.is_empty());

        let dense = ctx["link_per_day_dense"].as_array().unwrap();
        assert_eq!(dense.len(), 3);
        assert!(dense.iter().all(|b| b["count"] == 0));

        let web = ctx["web_per_day_dense"].as_array().unwrap();
        assert_eq!(web[1]["date"], "2024-01-02");
        assert_eq!(web[1]["count"], 1);
    }

    // ========== render tests ==========

    #[test]
    fn test_render_report_contains_sections() {
        let text = render_report(&sample_report());
        assert!(text.contains("Voting window 2024-01-01 → 2024-01-05 (as of 2024-01-03)"));
        assert!(text.contains("1,500"));
        assert!(text.contains("Web"));
        assert!(text.contains("2024-01-03"));
        assert!(text.contains("Peak: 2024-01-01 (2)"));
        assert!(text.contains("Last ballot            2024-01-02 18:30:00"));
        assert!(text.contains("Norte"));
        assert!(!text.contains("Other"));
    }

    #[test]
    fn test_render_report_without_ballots_omits_last_ballot() {
        let mut report = sample_report();
        report.last_ballot_at = None;
        assert!(!render_report(&report).contains("Last ballot"));
    }

    #[test]
    fn test_render_pending_empty_axis() {
        let report = PendingReport {
            users: 0,
            pending_users: 0,
            per_day: DailyCounts::new(),
            date_axis: Vec::new(),
        };
        assert!(render_pending(&report).contains("(no days in window)"));
    }

    #[test]
    fn test_render_voters() {
        let text = render_voters(&VotersSummary::new(1200, 200));
        assert!(text.contains("1,200"));
        assert!(text.contains("1,000"));
    }
}
