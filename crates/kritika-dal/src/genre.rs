crate::value_repository!(Genre, "genre");
