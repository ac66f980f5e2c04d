diesel::table! {
    packages (id) {
        id -> Text,
        name -> Text,
        latest_version -> Text,
        description -> Text,
        tags -> Nullable<Jsonb>,
        owner_id -> Text,
        owner_name -> Text,
        owner_email -> Text,
        url -> Text,
        created_at -> Text,
        updated_at -> Text,
        downloads -> BigInt,
    }
}

diesel::table! {
    tarballs (id) {
        id -> Text,
        package_id -> Text,
        version -> Text,
        depends -> Nullable<Jsonb>,
        data -> Binary,
        size -> BigInt,
        hash -> Text,
        created_at -> Text,
    }
}

diesel::joinable!(tarballs -> packages (package_id));

diesel::allow_tables_to_appear_in_same_query!(packages, tarballs);
