mod engine;
mod executor;
mod partition;
mod summary;
mod types;

pub use executor::{run_parallel, run_sequential};
pub use partition::{chunk_offsets, chunk_sizes};
pub use summary::{render_csv, summarize, write_csv};
pub use types::{EngineError, Path, PathMatrix, SimulationConfig, SummaryRow};
