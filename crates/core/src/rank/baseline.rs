pub const SCORE_MIN: f64 = 60.0;
pub const SCORE_MAX: f64 = 95.0;

pub const DEFAULT_BASE: f64 = 75.0;
pub const DEFAULT_AGENTIC: f64 = 10.0;

/// Static inputs mapped onto the bounded score scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub base: f64,
    pub agentic: f64,
}

pub fn normalize(base: Option<f64>, agentic: Option<f64>) -> Baseline {
    let base = base.filter(|v| v.is_finite()).unwrap_or(DEFAULT_BASE);
    let agentic = agentic.filter(|v| v.is_finite()).unwrap_or(DEFAULT_AGENTIC);

    Baseline {
        base: clamp_score(base),
        agentic: clamp_score(SCORE_MIN + agentic * 1.1),
    }
}

pub fn clamp_score(v: f64) -> f64 {
    v.clamp(SCORE_MIN, SCORE_MAX)
}
