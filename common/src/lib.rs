#[macro_use]
pub mod macros;

agg_mod![catalog, db, memory, models, store, utils];
