//! Math utility functions

/// Logistic sigmoid
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Argmax over every `stride`-th element starting at `start`
///
/// Used to scan one channel of an interleaved (HWC) buffer. The returned
/// index counts strided steps, not raw positions. NaN entries never win and
/// the first maximum is kept on ties. Returns 0 when nothing is scanned.
pub fn argmax_strided(x: &[f32], start: usize, stride: usize) -> usize {
    x.iter()
        .skip(start)
        .step_by(stride.max(1))
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f32)>, (idx, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}
