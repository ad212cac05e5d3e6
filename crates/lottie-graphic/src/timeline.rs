//! Percent-positioned timelines built from Lottie keyframe lists.

use crate::element::{AttrMap, AttrValue};
use lottie_data::model::{BezierTangent, Keyframe};
use serde::Serialize;

/// An explicit animation track: `keyframes` patch the element's static
/// attributes at their `percent` of `duration`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub duration: f64,
    pub delay: f64,
    #[serde(rename = "loop", skip_serializing_if = "Option::is_none")]
    pub looped: Option<bool>,
    pub keyframes: Vec<TimelineKeyframe>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineKeyframe {
    pub percent: f64,
    /// Curve of the segment ending at this keyframe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub easing: Option<String>,
    #[serde(flatten)]
    pub patch: AttrMap,
}

impl Timeline {
    /// True if any keyframe patches `key` at the root level.
    pub fn touches(&self, key: &str) -> bool {
        self.keyframes.iter().any(|kf| kf.patch.contains_key(key))
    }

    /// Renames root-level `from` to `to` in every keyframe, mapping numbers
    /// through `map`.
    pub fn retarget(&mut self, from: &str, to: &str, map: impl Fn(f64) -> f64) {
        for kf in &mut self.keyframes {
            if let Some(value) = kf.patch.remove(from) {
                let value = match value {
                    AttrValue::Number(n) => AttrValue::Number(map(n)),
                    other => other,
                };
                kf.patch.insert(to.to_owned(), value);
            }
        }
    }

    /// First patch carrying a value, used to seed static attributes.
    pub fn first_patch(&self) -> Option<&AttrMap> {
        self.keyframes.first().map(|kf| &kf.patch)
    }
}

/// Document-wide timing shared by every timeline of a compile pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeContext {
    /// Milliseconds per frame.
    pub frame_time: f64,
    /// Document out-frame; keyframe percents are measured against it.
    pub out_frame: f64,
    /// Start offset in milliseconds, accumulated from layer `st`.
    pub delay: f64,
    pub looped: bool,
}

impl TimeContext {
    pub fn new(frame_rate: f64, out_frame: f64) -> Self {
        TimeContext {
            frame_time: 1000.0 / frame_rate,
            out_frame,
            delay: 0.0,
            looped: false,
        }
    }

    pub fn with_loop(mut self, looped: bool) -> Self {
        self.looped = looped;
        self
    }

    /// Context for a layer starting `frames` later than this one.
    pub fn offset_by(mut self, frames: f64) -> Self {
        self.delay += frames * self.frame_time;
        self
    }

    pub fn duration(&self) -> f64 {
        self.out_frame * self.frame_time
    }

    pub fn percent(&self, frame: f64) -> f64 {
        if self.out_frame <= 0.0 {
            return 0.0;
        }
        (frame / self.out_frame).clamp(0.0, 1.0)
    }
}

/// Builds one timeline from `keyframes`. `extract` turns a keyframe value
/// into its attribute patch; returning `None` drops that keyframe. Easing
/// handles are read at `axis`.
pub fn build_timeline<T>(
    keyframes: &[Keyframe<T>],
    axis: usize,
    clock: &TimeContext,
    mut extract: impl FnMut(&T) -> Option<AttrMap>,
) -> Option<Timeline> {
    let mut out: Vec<TimelineKeyframe> = Vec::with_capacity(keyframes.len() + 1);
    let mut previous_end: Option<&T> = None;
    let mut previous_patch: Option<AttrMap> = None;

    for (idx, kf) in keyframes.iter().enumerate() {
        let value = kf.s.as_ref().or(previous_end);
        previous_end = kf.e.as_ref().or(kf.s.as_ref()).or(previous_end);

        let Some(patch) = value.and_then(&mut extract) else {
            continue;
        };
        let percent = clock.percent(kf.t);

        match idx.checked_sub(1).map(|p| &keyframes[p]) {
            None => {
                if kf.t > 0.0 {
                    out.push(TimelineKeyframe {
                        percent: 0.0,
                        easing: None,
                        patch: patch.clone(),
                    });
                }
            }
            Some(prev) => {
                // A hold keyframe keeps its value until this one starts.
                if prev.h == Some(1) {
                    if let Some(held) = previous_patch.take() {
                        out.push(TimelineKeyframe {
                            percent,
                            easing: None,
                            patch: held,
                        });
                    }
                }
            }
        }

        let easing = idx
            .checked_sub(1)
            .filter(|&p| keyframes[p].h != Some(1))
            .and_then(|p| segment_easing(&keyframes[p], kf, axis));

        previous_patch = Some(patch.clone());
        out.push(TimelineKeyframe {
            percent,
            easing,
            patch,
        });
    }

    if out.is_empty() {
        return None;
    }
    Some(Timeline {
        duration: clock.duration(),
        delay: clock.delay,
        looped: clock.looped.then_some(true),
        keyframes: out,
    })
}

/// `cubic-bezier(...)` for the segment `from` → `to`, or `None` when the
/// handles sit on the linear corners.
fn segment_easing<T>(from: &Keyframe<T>, to: &Keyframe<T>, axis: usize) -> Option<String> {
    let handle = |tangent: Option<&BezierTangent>, default: f64| {
        let x = tangent.and_then(|t| t.x_at(axis)).unwrap_or(default);
        let y = tangent.and_then(|t| t.y_at(axis)).unwrap_or(default);
        (x, y)
    };
    let (x1, y1) = handle(from.o.as_ref(), 0.0);
    let (x2, y2) = handle(to.i.as_ref(), 1.0);

    if x1 == 0.0 && y1 == 0.0 && x2 == 1.0 && y2 == 1.0 {
        return None;
    }
    Some(format!("cubic-bezier({x1},{y1},{x2},{y2})"))
}
