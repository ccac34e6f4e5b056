// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job progress events.
//
// Every job produces an append-only stream of `Status` events; the most
// recent one is what polling clients see. A stream ends with exactly one
// event carrying `done = true`, either the `done` stage or an error
// (`progress = -1`).

use serde::{Deserialize, Serialize};

use crate::types::JobId;

/// Progress value reported by terminal error events.
pub const ERROR_PROGRESS: f32 = -1.0;

/// The eight pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Decode = 1,
    Rotate = 2,
    Resize = 3,
    Center = 4,
    Dither = 5,
    Save = 6,
    Transmit = 7,
    Done = 8,
}

impl Stage {
    pub const COUNT: u8 = 8;

    /// All stages in order.
    pub fn all() -> [Stage; 8] {
        [
            Self::Decode,
            Self::Rotate,
            Self::Resize,
            Self::Center,
            Self::Dither,
            Self::Save,
            Self::Transmit,
            Self::Done,
        ]
    }

    /// 1-based position in the pipeline.
    pub fn number(&self) -> u8 {
        *self as u8
    }

    /// Fraction of the pipeline reached when this stage starts.
    pub fn progress(&self) -> f32 {
        f32::from(self.number()) / f32::from(Self::COUNT)
    }

    /// Step label shown to clients.
    pub fn step_name(&self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Rotate => "rotating",
            Self::Resize => "resizing",
            Self::Center => "centering",
            Self::Dither => "dithering",
            Self::Save => "saving",
            Self::Transmit => "printing",
            Self::Done => "done",
        }
    }

    /// Stages after which the processed image can be fetched.
    fn reload_hint(&self) -> bool {
        matches!(self, Self::Transmit | Self::Done)
    }
}

/// A single progress event for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub id: JobId,
    pub step: String,
    /// In `[0, 1]`, or [`ERROR_PROGRESS`].
    pub progress: f32,
    pub done: bool,
    /// Tells the client to re-fetch `/img/{id}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload: Option<bool>,
}

impl Status {
    /// First event of every job, published at admission.
    pub fn queued(id: JobId) -> Self {
        Self {
            id,
            step: "queued".into(),
            progress: 0.0,
            done: false,
            reload: None,
        }
    }

    /// Event published right before `stage` runs. `Stage::Done` is terminal.
    pub fn stage(id: JobId, stage: Stage) -> Self {
        Self {
            id,
            step: stage.step_name().into(),
            progress: stage.progress(),
            done: stage == Stage::Done,
            reload: stage.reload_hint().then_some(true),
        }
    }

    /// Terminal error event.
    pub fn failed(id: JobId, message: impl Into<String>) -> Self {
        Self {
            id,
            step: message.into(),
            progress: ERROR_PROGRESS,
            done: true,
            reload: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.progress < 0.0
    }
}
