#![deny(warnings)]
#![deny(unused_imports)]

pub mod facade;
pub mod toolbox;

pub use facade::{QueryResponse, QueryTool, ToolResponse};
pub use toolbox::{Card, CardCatalog, CardResponse, ToolKind, Toolbox};
