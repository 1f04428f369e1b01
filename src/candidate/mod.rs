//! Candidate selection and pruning utilities.
//!
//! Includes Top-K collection of scan peaks and overlap suppression of matches.

pub mod nms;
pub mod topk;
