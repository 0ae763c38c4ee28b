diesel::table! {
    cache_entries (cache_key) {
        cache_key -> Text,
        value -> Text,
        expires_at -> BigInt,
    }
}
