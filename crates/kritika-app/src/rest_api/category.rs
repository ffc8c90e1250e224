crate::value_api!(Category);
