use serde::Deserialize;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
    #[serde(default)]
    pub in_tangent: Option<f32>,
    #[serde(default)]
    pub out_tangent: Option<f32>,
}

impl CurveKey {
    pub const fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: None,
            out_tangent: None,
        }
    }

    pub const fn with_tangents(time: f32, value: f32, in_tangent: f32, out_tangent: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: Some(in_tangent),
            out_tangent: Some(out_tangent),
        }
    }
}

/// Keyframed remapping curve evaluated with cubic Hermite segments.
///
/// Immutable after construction, so one instance can be shared by every worker
/// building height maps.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(from = "Vec<CurveKey>")]
pub struct HeightCurve {
    keys: Vec<CurveKey>,
}

impl Default for HeightCurve {
    fn default() -> Self {
        Self::linear()
    }
}

impl From<Vec<CurveKey>> for HeightCurve {
    fn from(keys: Vec<CurveKey>) -> Self {
        Self::new(keys)
    }
}

impl HeightCurve {
    pub fn new(mut keys: Vec<CurveKey>) -> Self {
        keys.retain(|k| k.time.is_finite() && k.value.is_finite());
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        keys.dedup_by(|a, b| a.time == b.time);
        Self { keys }
    }

    /// Identity over [0,1].
    pub fn linear() -> Self {
        Self::new(vec![
            CurveKey::with_tangents(0.0, 0.0, 1.0, 1.0),
            CurveKey::with_tangents(1.0, 1.0, 1.0, 1.0),
        ])
    }

    pub fn constant(value: f32) -> Self {
        Self::new(vec![CurveKey::new(0.0, value)])
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    // Finite-difference slope at key `i` for keys without explicit tangents.
    fn auto_tangent(&self, i: usize) -> f32 {
        let n = self.keys.len();
        let (a, b) = match i {
            0 => (0, 1),
            _ if i + 1 == n => (i - 1, i),
            _ => (i - 1, i + 1),
        };
        let dt = self.keys[b].time - self.keys[a].time;
        if dt > 0.0 {
            (self.keys[b].value - self.keys[a].value) / dt
        } else {
            0.0
        }
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let n = self.keys.len();
        match n {
            0 => return 0.0,
            1 => return self.keys[0].value,
            _ => {}
        }
        let first = self.keys[0];
        let last = self.keys[n - 1];
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }
        // First key strictly after t; keys are sorted and t is inside the range.
        let hi = self.keys.partition_point(|k| k.time <= t);
        let lo = hi - 1;
        let k0 = self.keys[lo];
        let k1 = self.keys[hi];
        let m0 = k0.out_tangent.unwrap_or_else(|| self.auto_tangent(lo));
        let m1 = k1.in_tangent.unwrap_or_else(|| self.auto_tangent(hi));

        let dt = k1.time - k0.time;
        let s = (t - k0.time) / dt;
        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;
        h00 * k0.value + h10 * dt * m0 + h01 * k1.value + h11 * dt * m1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_curve_is_identity() {
        let c = HeightCurve::linear();
        for i in 0..=20 {
            let t = i as f32 / 20.0;
            assert!((c.evaluate(t) - t).abs() < 1e-5, "t={t}");
        }
    }

    #[test]
    fn clamps_outside_key_range() {
        let c = HeightCurve::new(vec![CurveKey::new(0.2, 0.5), CurveKey::new(0.8, 2.0)]);
        assert_eq!(c.evaluate(-1.0), 0.5);
        assert_eq!(c.evaluate(5.0), 2.0);
    }

    #[test]
    fn passes_through_keys() {
        let c = HeightCurve::new(vec![
            CurveKey::new(0.0, 0.0),
            CurveKey::new(0.4, 0.05),
            CurveKey::new(1.0, 1.0),
        ]);
        assert!((c.evaluate(0.4) - 0.05).abs() < 1e-6);
        assert!((c.evaluate(0.0)).abs() < 1e-6);
    }

    #[test]
    fn unsorted_keys_are_ordered() {
        let c = HeightCurve::new(vec![CurveKey::new(1.0, 1.0), CurveKey::new(0.0, 0.0)]);
        assert_eq!(c.keys()[0].time, 0.0);
        assert!((c.evaluate(0.5) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn empty_and_constant_curves() {
        assert_eq!(HeightCurve::new(Vec::new()).evaluate(0.3), 0.0);
        assert_eq!(HeightCurve::constant(2.5).evaluate(0.3), 2.5);
    }
}
