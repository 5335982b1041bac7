//! Easing functions for keyframe timing.
//!
//! CSS-compatible timing functions:
//! - Linear
//! - Ease, EaseIn, EaseOut, EaseInOut (standard CSS curves)
//! - CubicBezier (custom bezier curves)
//! - Steps (stepped animations)
//!
//! Easings are written and read as CSS strings, both in code and in
//! serialized definitions.
//!
//! # Usage
//!
//! ```ignore
//! use cadence_timeline::easing::EasingFunction;
//!
//! let ease: EasingFunction = "ease-out".parse()?;
//! let progress = ease.evaluate(0.5);
//!
//! let custom: EasingFunction = "cubic-bezier(0.4, 0, 0.2, 1)".parse()?;
//! assert_eq!(custom.to_string(), "cubic-bezier(0.4, 0, 0.2, 1)");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position for stepped easing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepPosition {
    /// Jump at the start of each interval (CSS `jump-start` / `start`).
    Start,
    /// Jump at the end of each interval (CSS `jump-end` / `end`).
    #[default]
    End,
    /// Jump at both start and end (CSS `jump-both`).
    Both,
    /// No jump at start or end (CSS `jump-none`).
    None,
}

impl StepPosition {
    fn css_name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Both => "jump-both",
            Self::None => "jump-none",
        }
    }
}

/// Easing function applied to a keyframe segment.
///
/// Maps linear progress (0.0 to 1.0) to eased progress.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EasingFunction {
    /// No easing.
    Linear,

    /// CSS `ease`: `cubic-bezier(0.25, 0.1, 0.25, 1.0)`.
    #[default]
    Ease,

    /// CSS `ease-in`: `cubic-bezier(0.42, 0, 1, 1)`.
    EaseIn,

    /// CSS `ease-out`: `cubic-bezier(0, 0, 0.58, 1)`.
    EaseOut,

    /// CSS `ease-in-out`: `cubic-bezier(0.42, 0, 0.58, 1)`.
    EaseInOut,

    /// Custom cubic bezier curve with control points (x1, y1) and (x2, y2).
    /// x values lie in [0, 1].
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },

    /// Stepped easing with `count` intervals (>= 1).
    Steps { count: u32, position: StepPosition },
}

/// Error returned when an easing string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEasingError(pub String);

impl fmt::Display for ParseEasingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown easing: {:?}", self.0)
    }
}

impl std::error::Error for ParseEasingError {}

impl EasingFunction {
    /// Evaluate the easing at progress `t` (clamped to 0.0-1.0).
    ///
    /// Bezier curves may return values outside 0.0-1.0.
    pub fn evaluate(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        match self {
            Self::Linear => t,
            Self::Ease => cubic_bezier(0.25, 0.1, 0.25, 1.0, t),
            Self::EaseIn => cubic_bezier(0.42, 0.0, 1.0, 1.0, t),
            Self::EaseOut => cubic_bezier(0.0, 0.0, 0.58, 1.0, t),
            Self::EaseInOut => cubic_bezier(0.42, 0.0, 0.58, 1.0, t),
            Self::CubicBezier { x1, y1, x2, y2 } => cubic_bezier(*x1, *y1, *x2, *y2, t),
            Self::Steps { count, position } => stepped(*count, *position, t),
        }
    }

    /// Custom cubic bezier, or `None` when x1/x2 fall outside [0, 1].
    pub fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Option<Self> {
        let valid = (0.0..=1.0).contains(&x1) && (0.0..=1.0).contains(&x2);
        valid.then_some(Self::CubicBezier { x1, y1, x2, y2 })
    }

    /// Stepped easing, or `None` for zero steps.
    pub fn steps(count: u32, position: StepPosition) -> Option<Self> {
        (count >= 1).then_some(Self::Steps { count, position })
    }
}

impl FromStr for EasingFunction {
    type Err = ParseEasingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseEasingError(s.to_string());
        let name = s.trim().to_ascii_lowercase();

        match name.as_str() {
            "linear" => return Ok(Self::Linear),
            "ease" => return Ok(Self::Ease),
            "ease-in" => return Ok(Self::EaseIn),
            "ease-out" => return Ok(Self::EaseOut),
            "ease-in-out" => return Ok(Self::EaseInOut),
            "step-start" => return Ok(Self::Steps { count: 1, position: StepPosition::Start }),
            "step-end" => return Ok(Self::Steps { count: 1, position: StepPosition::End }),
            _ => {}
        }

        let (func, args) = name
            .strip_suffix(')')
            .and_then(|body| body.split_once('('))
            .ok_or_else(err)?;
        let args: Vec<&str> = args.split(',').map(str::trim).collect();

        match func.trim() {
            "cubic-bezier" => {
                let [x1, y1, x2, y2] = args.as_slice() else {
                    return Err(err());
                };
                let parse = |v: &str| v.parse::<f64>().map_err(|_| err());
                Self::cubic_bezier(parse(x1)?, parse(y1)?, parse(x2)?, parse(y2)?).ok_or_else(err)
            }
            "steps" => {
                let (count, position) = match args.as_slice() {
                    [count] => (count, StepPosition::End),
                    [count, position] => {
                        let position = match *position {
                            "start" | "jump-start" => StepPosition::Start,
                            "end" | "jump-end" => StepPosition::End,
                            "jump-both" => StepPosition::Both,
                            "jump-none" => StepPosition::None,
                            _ => return Err(err()),
                        };
                        (count, position)
                    }
                    _ => return Err(err()),
                };
                let count = count.parse::<u32>().map_err(|_| err())?;
                Self::steps(count, position).ok_or_else(err)
            }
            _ => Err(err()),
        }
    }
}

impl fmt::Display for EasingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => f.write_str("linear"),
            Self::Ease => f.write_str("ease"),
            Self::EaseIn => f.write_str("ease-in"),
            Self::EaseOut => f.write_str("ease-out"),
            Self::EaseInOut => f.write_str("ease-in-out"),
            Self::CubicBezier { x1, y1, x2, y2 } => {
                write!(f, "cubic-bezier({}, {}, {}, {})", x1, y1, x2, y2)
            }
            Self::Steps { count, position } => {
                write!(f, "steps({}, {})", count, position.css_name())
            }
        }
    }
}

impl TryFrom<String> for EasingFunction {
    type Error = ParseEasingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EasingFunction> for String {
    fn from(easing: EasingFunction) -> Self {
        easing.to_string()
    }
}

/// Evaluate a cubic bezier curve at `progress`.
///
/// Newton-Raphson finds the curve parameter whose x matches the progress,
/// then the y coordinate at that parameter is returned.
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, progress: f64) -> f64 {
    if progress <= 0.0 {
        return 0.0;
    }
    if progress >= 1.0 {
        return 1.0;
    }

    let t = solve_bezier_x(x1, x2, progress);
    bezier_y(y1, y2, t)
}

fn solve_bezier_x(x1: f64, x2: f64, target_x: f64) -> f64 {
    let mut t = target_x;

    for _ in 0..8 {
        let x = bezier_x(x1, x2, t) - target_x;
        if x.abs() < 1e-7 {
            break;
        }

        let dx = bezier_x_derivative(x1, x2, t);
        if dx.abs() < 1e-7 {
            break;
        }

        t = (t - x / dx).clamp(0.0, 1.0);
    }

    t
}

/// x(t) = 3(1-t)²t·x1 + 3(1-t)t²·x2 + t³
#[inline]
fn bezier_x(x1: f64, x2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * t * x1 + 3.0 * mt * t * t * x2 + t * t * t
}

#[inline]
fn bezier_y(y1: f64, y2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * t * y1 + 3.0 * mt * t * t * y2 + t * t * t
}

/// dx/dt = 3(1-t)²·x1 + 6(1-t)t·(x2-x1) + 3t²·(1-x2)
#[inline]
fn bezier_x_derivative(x1: f64, x2: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    3.0 * mt * mt * x1 + 6.0 * mt * t * (x2 - x1) + 3.0 * t * t * (1.0 - x2)
}

fn stepped(steps: u32, position: StepPosition, t: f64) -> f64 {
    if steps == 0 {
        return t;
    }

    let steps_f = steps as f64;

    match position {
        StepPosition::Start => (t * steps_f).ceil() / steps_f,
        StepPosition::End => (t * steps_f).floor() / steps_f,
        StepPosition::Both => ((t * (steps_f + 1.0)).floor() / steps_f).min(1.0),
        StepPosition::None => {
            if steps == 1 {
                0.5
            } else {
                ((t * steps_f).floor() / (steps_f - 1.0)).min(1.0)
            }
        }
    }
}
