mod load;
mod types;

pub use load::{config_file_candidates, get_epicflow_data_dir, load_default, load_from_path};
pub use types::*;
