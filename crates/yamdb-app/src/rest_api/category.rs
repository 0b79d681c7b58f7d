use yamdb_dal::category::{CategoryRepository, CreateCategory};

crate::lookup_api!(CategoryRepository, CreateCategory);
