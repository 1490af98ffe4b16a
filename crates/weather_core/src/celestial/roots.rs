/// A bracketed zero of a sampled function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Crossing {
    pub hour: f64,
    /// True when the function goes from negative to non-negative.
    pub rising: bool,
}

/// Sample `f` every `step` hours over `[start, end]`, bracket each sign change
/// and refine it by bisection until the bracket is narrower than `tolerance`.
pub fn find_crossings<F>(f: F, start: f64, end: f64, step: f64, tolerance: f64) -> Vec<Crossing>
where
    F: Fn(f64) -> f64,
{
    let mut crossings = Vec::new();
    if !(end > start) || !(step > 0.0) {
        return crossings;
    }
    let samples = ((end - start) / step).ceil() as usize;
    let mut prev_t = start;
    let mut prev_v = f(start);
    for i in 1..=samples {
        let t = (start + step * i as f64).min(end);
        let v = f(t);
        if (prev_v >= 0.0) != (v >= 0.0) {
            crossings.push(Crossing {
                hour: bisect(&f, prev_t, t, prev_v, tolerance),
                rising: v >= 0.0,
            });
        }
        prev_t = t;
        prev_v = v;
    }
    crossings
}

fn bisect<F>(f: &F, mut lo: f64, mut hi: f64, lo_value: f64, tolerance: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let lo_positive = lo_value >= 0.0;
    // 64 halvings exhaust f64 precision; the cap only guards odd tolerances.
    for _ in 0..64 {
        if hi - lo <= tolerance {
            break;
        }
        let mid = 0.5 * (lo + hi);
        if (f(mid) >= 0.0) == lo_positive {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}
