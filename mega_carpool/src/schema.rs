//! Schema for the secondary mega-carpool Postgres database — kept separate
//! from `portal_db::schema` since it lives in its own database, not a
//! second connection to the primary one.

diesel::table! {
    mega_carpool_orgs (org_id) {
        org_id -> Int8,
        mega_id -> Int8,
    }
}
