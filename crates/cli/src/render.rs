//! Text rendering for outcomes and artifact summaries

use std::fmt::Write;
use traffic_core::{Artifact, BindingStrategy, Outcome};

/// How loudly a predicted condition is announced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl Severity {
    fn tag(self) -> &'static str {
        match self {
            Severity::Success => "ok",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Banner severity, marker and one-line advice for the standard labels
pub fn advisory(label: &str) -> Option<(Severity, &'static str, &'static str)> {
    match label {
        "Low Traffic" => Some((Severity::Success, "🟢", "Smooth flow of vehicles")),
        "Moderate Traffic" => Some((Severity::Info, "🟡", "Slight delays expected")),
        "High Traffic" => Some((Severity::Warning, "🟠", "Expect congestion")),
        "Severe Congestion" => Some((Severity::Error, "🔴", "Avoid this route if possible")),
        _ => None,
    }
}

pub fn outcome_text(outcome: &Outcome) -> String {
    let mut out = String::new();
    match outcome {
        Outcome::Predicted(prediction) => {
            let _ = writeln!(out, "🚦 Predicted Traffic Condition: {}", prediction.label);
            if let Some((severity, marker, advice)) = advisory(&prediction.label) {
                let _ = writeln!(
                    out,
                    "{marker} [{}] {}: {advice}",
                    severity.tag(),
                    prediction.label
                );
            }
            if let Some(confidence) = prediction.confidence {
                let _ = writeln!(out, "Prediction Confidence: {confidence:.2}%");
            }
        }
        Outcome::Failed {
            message,
            diagnostic,
        } => {
            let _ = writeln!(out, "⚠️  {message}");
            for line in diagnostic.lines() {
                let _ = writeln!(out, "    {line}");
            }
        }
    }
    out
}

pub fn artifact_summary(artifact: &Artifact) -> String {
    let mut out = String::new();
    let strategy = BindingStrategy::for_artifact(artifact);

    let _ = writeln!(out, "Artifact:      {}", artifact.name);
    let _ = writeln!(out, "Fingerprint:   {}", artifact.fingerprint());
    let _ = writeln!(out, "Binding:       {strategy}");
    let _ = writeln!(
        out,
        "Probabilities: {}",
        if artifact.supports_proba() { "yes" } else { "no" }
    );
    let classes: Vec<String> = artifact.classes().iter().map(|c| c.to_string()).collect();
    let _ = writeln!(out, "Classes:       {}", classes.join(", "));
    let _ = writeln!(out, "Columns:");
    for (i, column) in artifact.schema().columns().iter().enumerate() {
        let _ = writeln!(out, "  {i:>2}  {:<22} {}", column.name, column.kind);
    }
    out
}
