//! Terminal reporting for the `tpa` binary.
//!
//! All formatting lives here, on the consumer side of the plain result
//! structure — the engine output itself stays free of rounded strings and
//! presentation choices, exactly like any other UI collaborator would see
//! it.

use crate::domain::{InversionQuality, Kpis, PathContribution, TpaComputationResult, TruncationSpec};

/// Paths ordered by aggregate contribution level, loudest first.
pub fn rank_contributions(result: &TpaComputationResult) -> Vec<&PathContribution> {
    let mut ranked: Vec<&PathContribution> = result.contributions.paths.iter().collect();
    ranked.sort_by(|a, b| b.level_db.partial_cmp(&a.level_db).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}

/// Full run summary: header, KPIs, ranked contributions, inversion
/// diagnostics, accuracy table.
pub fn format_result_summary(result: &TpaComputationResult) -> String {
    let mut out = String::new();

    out.push_str("=== tpa - Transfer Path Analysis ===\n");
    out.push_str(&format!("Targets: {}\n", result.targets.join(", ")));

    let freqs = &result.response.frequencies_hz;
    if let (Some(first), Some(last)) = (freqs.first(), freqs.last()) {
        out.push_str(&format!(
            "Band: [{first:.1}, {last:.1}] Hz | {} bins\n",
            freqs.len()
        ));
    }
    match result.params.truncation {
        TruncationSpec::Percentage(pct) => {
            out.push_str(&format!("Truncation: {pct}% of singular values\n"));
        }
        TruncationSpec::Energy(threshold) => {
            out.push_str(&format!("Truncation: {threshold} energy capture\n"));
        }
    }

    out.push('\n');
    out.push_str(&format_kpis(&result.kpis));

    out.push_str("\nContributions (aggregate level, loudest first):\n");
    for (i, path) in rank_contributions(result).iter().enumerate() {
        out.push_str(&format!(
            "  {:>2}. {:<24} {:>8.2} dB\n",
            i + 1,
            path.path,
            path.level_db
        ));
    }

    out.push_str("\nInversion diagnostics:\n");
    let poor = result
        .svd
        .iter()
        .filter(|d| d.quality == InversionQuality::Poor)
        .count();
    let degenerate = result.svd.iter().filter(|d| d.degenerate).count();
    let ranks: Vec<usize> = result.svd.iter().map(|d| d.rank_used).collect();
    let rank_min = ranks.iter().min().copied().unwrap_or(0);
    let rank_max = ranks.iter().max().copied().unwrap_or(0);
    out.push_str(&format!(
        "  bins: {} | rank used: {rank_min}..{rank_max} | poor: {poor} | degenerate: {degenerate} (condition threshold {})\n",
        result.svd.len(),
        result.params.tuning.condition_threshold
    ));
    if let Some(worst) = result
        .svd
        .iter()
        .filter_map(|d| d.full_condition_number.map(|c| (c, d.frequency_hz)))
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
    {
        out.push_str(&format!(
            "  worst spectrum condition: {:.3e} at {:.1} Hz\n",
            worst.0, worst.1
        ));
    }

    out.push_str("\nPrediction accuracy:\n");
    out.push_str(&format!(
        "  overall: {}\n",
        format_accuracy(result.accuracy.overall_pct)
    ));
    for band in &result.accuracy.bands {
        out.push_str(&format!(
            "  {:<6} [{:.0}, {:.0}) Hz: {} ({} bins)\n",
            band.name,
            band.min_hz,
            band.max_hz,
            format_accuracy(band.accuracy_pct),
            band.bins
        ));
    }
    let excluded = result.accuracy.errors.iter().filter(|e| e.excluded).count();
    if excluded > 0 {
        out.push_str(&format!(
            "  excluded bins (measured below floor): {excluded}\n"
        ));
    }

    out
}

/// KPI block, also used standalone by `tpa kpis`.
pub fn format_kpis(kpis: &Kpis) -> String {
    let mut out = String::new();
    out.push_str("KPIs:\n");
    out.push_str(&format!(
        "  overall level: {:.2} dB\n",
        kpis.overall_level_db
    ));
    out.push_str(&format!("  peak path: {}\n", kpis.peak_path));
    out.push_str(&format!(
        "  dominant frequency: {:.1} Hz\n",
        kpis.dominant_frequency_hz
    ));
    out.push_str(&format!(
        "  transfer efficiency: {:.1}%\n",
        kpis.transfer_efficiency_pct
    ));
    out
}

fn format_accuracy(accuracy: Option<f64>) -> String {
    match accuracy {
        Some(pct) => format!("{pct:.1}%"),
        None => "n/a".to_string(),
    }
}
