//! lambdaflow コア
//!
//! スタックモデル（ハンドラー、トリガー、実行設定）、KDLパーサー、
//! `stack.kdl` の自動発見、事前検証を提供します。

pub mod discovery;
pub mod error;
pub mod loader;
pub mod model;
pub mod parser;
pub mod validate;

pub use discovery::{
    DiscoveredFiles, PROJECT_DIR, STACK_FILE, STACK_LOCAL_FILE, discover_files,
    find_project_root, find_project_root_from,
};
pub use error::{FlowError, Result, ValidationError};
pub use loader::{BUCKET_ENV, REGION_ENV, apply_env_overrides, load_stack, load_stack_from_root};
pub use model::*;
pub use parser::{parse_kdl_file, parse_kdl_overlay, parse_kdl_string};
pub use validate::{validate, validate_handlers, validate_stack};
