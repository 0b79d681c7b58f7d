crate::lookup::lookup_entity!(
    Category,
    CreateCategory,
    CategoryRepository,
    CategoryRepositoryImpl,
    "category"
);
