use loom_layout::{Layout, Schema};

/// WGSL declarations every resolve program is compiled against.
///
/// Provides `params`, `point(index)`, `src_u32/src_f32(row, word)` and
/// `dst_u32/dst_f32/dst_vec3(row, word, v)`, and the `resolve_main` entry
/// point, which calls the program's `resolve_row(row)`.
pub const RESOLVE_PRELUDE: &str = include_str!("shaders/prelude.wgsl");

/// One resolve transformation: WGSL body plus the layouts it reads and writes.
///
/// The target schema is declared independently of the source schema.
pub trait ResolveProgram {
    /// Stable name for pipelines and logs. Together with [`wgsl`](Self::wgsl)
    /// it keys the pipeline cache.
    fn label(&self) -> &'static str;

    /// WGSL defining `fn resolve_row(row: u32)`.
    fn wgsl(&self) -> &'static str;

    fn source_schema(&self) -> Schema;
    fn target_schema(&self) -> Schema;

    fn source_layout(&self) -> Layout {
        Layout::of_schema(&self.source_schema())
    }

    fn target_layout(&self) -> Layout {
        Layout::of_schema(&self.target_schema())
    }

    /// Prelude followed by the program body.
    fn shader_source(&self) -> String {
        format!("{RESOLVE_PRELUDE}\n// ── {} ──\n{}", self.label(), self.wgsl())
    }
}
