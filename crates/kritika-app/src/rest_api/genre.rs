crate::value_api!(Genre);
