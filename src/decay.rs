use crate::Error;

/// A value that decays over discrete time
pub trait Decay {
    /// Calculate value at time `t`
    fn evaluate(&self, t: f64) -> f64;
}

fn validate(rate: f64, vi: f64, vf: f64) -> Result<(), Error> {
    ((rate >= 0.0 && vi > vf) || (rate < 0.0 && vi < vf))
        .then_some(())
        .ok_or(Error::InvalidDecay("`vi - vf` must have same sign as `rate`"))
}

/// A constant value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constant {
    value: f64,
}

impl Constant {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Decay for Constant {
    fn evaluate(&self, _t: f64) -> f64 {
        self.value
    }
}

/// v(t) = max(v<sub>i</sub> * r<sup>floor(t/s)</sup>, v<sub>f</sub>)
///
/// With `s = 1` this is the running product `v <- max(v * r, vf)` applied once per tick
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    rate: f64,
    vi: f64,
    vf: f64,
    step: f64,
}

impl Step {
    pub fn new(rate: f64, vi: f64, vf: f64, step: f64) -> Result<Self, Error> {
        validate(rate, vi, vf)?;
        if step <= 0.0 {
            return Err(Error::InvalidDecay("`step` must be positive"));
        }
        Ok(Self { rate, vi, vf, step })
    }

    /// Multiply by `rate` on every tick, never dropping below `vf`
    ///
    /// **Panics** if `vi - vf` does not have the same sign as `rate`
    pub fn per_tick(rate: f64, vi: f64, vf: f64) -> Self {
        if let Err(e) = validate(rate, vi, vf) {
            panic!("{e}");
        }
        Self {
            rate,
            vi,
            vf,
            step: 1.0,
        }
    }
}

impl Decay for Step {
    fn evaluate(&self, t: f64) -> f64 {
        let &Self { rate, vi, vf, step } = self;
        (vi * rate.powf((t / step).floor())).max(vf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_functional() {
        assert!(validate(1.0, 1.0, 0.0).is_ok());
        assert!(validate(1.0, -1.0, 0.0).is_err());
        assert!(validate(-1.0, 1.0, 0.0).is_err());
        assert!(validate(-1.0, -1.0, 0.0).is_ok());
    }

    #[test]
    fn constant_decay() {
        let x = Constant::new(1.0);
        assert_eq!(x.evaluate(0.0), 1.0);
        assert_eq!(x.evaluate(1.0), 1.0);
    }

    #[test]
    fn step_decay() {
        let x = Step::new(0.5, 2.0, 0.0, 0.5).unwrap();
        assert_eq!(x.evaluate(0.25), 2.0);
        assert_eq!(x.evaluate(0.75), 1.0);
        assert_eq!(x.evaluate(1.0), 0.5);
    }

    #[test]
    fn step_rejects_non_positive_step() {
        assert!(Step::new(0.5, 2.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn per_tick_decay_hits_floor() {
        let x = Step::per_tick(0.995, 1.0, 0.01);
        assert_eq!(x.evaluate(0.0), 1.0);
        assert_eq!(x.evaluate(1.0), 0.995);
        assert_eq!(x.evaluate(2.0), 0.995f64.powf(2.0));
        assert_eq!(x.evaluate(10_000.0), 0.01, "Clamped to the floor");
    }

    #[test]
    #[should_panic(expected = "same sign")]
    fn per_tick_rejects_rising_schedule() {
        Step::per_tick(0.995, 0.01, 1.0);
    }
}
