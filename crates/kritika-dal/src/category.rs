crate::value_repository!(Category, "category");
