//! Tree ensemble classifier used inside model artifacts
//!
//! - **Integer-only traversal**: features are scaled to fixed-point before
//!   walking the trees, so the same input always reaches the same leaves
//! - **One ensemble per class**: the predicted class is the highest raw score
//! - **Optional probabilities**: a softmax over raw scores, offered only when
//!   the artifact declares the capability
//!
//! # Estimator Format
//!
//! ```json
//! {
//!   "scale": 1000000,
//!   "classes": [0, 1],
//!   "class_scores": [
//!     {"bias": 0, "trees": [{"nodes": [
//!       {"id":0,"left":1,"right":2,"feature_idx":3,"threshold":12345,"leaf":null},
//!       {"id":1,"left":-1,"right":-1,"feature_idx":-1,"threshold":0,"leaf":-234},
//!       {"id":2,"left":-1,"right":-1,"feature_idx":-1,"threshold":0,"leaf":456}
//!     ], "weight": 1000000}]},
//!     {"bias": 0, "trees": []}
//!   ],
//!   "predict_proba": true
//! }
//! ```

pub mod model;
pub mod tree;

pub use model::{ClassLabel, ClassScore, Estimator, ModelError, SCALE};
pub use tree::{Node, Tree};
