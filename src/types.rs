/// Destination namespace for a bot's files, locally and remotely.
/// Examples: `crumbl_menu`, `tiktok_followers`, `tsla_stock`
pub type BotSlug = String;
/// Name of a record field.
/// Examples: `cookie`, `username`, `fetched`, `followerCount`
pub type FieldName = String;
/// Canonical day-granularity date string.
/// Example: `2025-08-04`
pub type DateString = String;
/// Named AWS credential profile.
/// Example: `haekeo`
pub type ProfileName = String;
/// One composite-key value: the record's key fields coerced to strings,
/// in key order.
/// Example: `["strawberry_cake", "2025-08-04"]`
pub type KeyValues = Vec<String>;
