pub mod assembly;
pub mod error;
pub mod genesis;
pub mod validate;
pub mod work;

pub use assembly::{prepare_new_block, should_drop_unfinished};
pub use error::Error;
pub use genesis::{genesis_block, genesis_params, GENESIS_HASH};
pub use validate::{block_hash, is_valid_block};
pub use work::{
    child_chain_root, distance, get_diff, get_exp_factor_diff, merkle_root, minimum_difficulty,
    prepare_work, MINIMUM_DIFFICULTY_HEX,
};
