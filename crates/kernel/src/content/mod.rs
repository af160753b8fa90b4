//! Content engine: block registry, renderers, and page assembly.

mod assembler;
mod block_render;
mod block_types;

pub use assembler::PageAssembler;
pub use block_render::{format_price, html_escape, render_error_fallback};
pub use block_types::{
    BlockDefinition, BlockRegistry, BlockSummary, FieldSpec, FieldType, LISTINGS_GRID_TYPE,
    RenderContext, RenderError, RenderFn, validate_props,
};
