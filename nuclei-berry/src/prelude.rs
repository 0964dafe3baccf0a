//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Image, LabelMap, Mask};
pub use crate::{BerryError, BerryResult, PersistError};

pub use crate::colormap::{Colormap, ColormapDef, ContrastLimits, Interpolation, Rgba};
pub use crate::consts::layer as layer_names;

#[cfg(feature = "remote")]
pub use crate::data::fetch;
pub use crate::data::{open, save_labels, save_rgba, ImgWriteRaw, ImgWriteVis, RawImage};

pub use crate::dataset::home_dataset_dir_with;

pub use crate::morph::{CleanParams, Connectivity};
pub use crate::peaks::PeakParams;

pub use crate::session::{CommandRegistry, Layer, LayerKind, PointSet, Session, ThresholdWidget};
pub use crate::watershed::Segmented;
pub use crate::workflow::{default_registry, Pipeline, Proposal, WorkflowParams};
