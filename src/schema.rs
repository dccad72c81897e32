diesel::table! {
    designs (id) {
        id -> Uuid,
        name -> Text,
        description -> Text,
        tags -> Nullable<Text>,
        design_type -> Text,
        created_by -> Text,
        created_on -> Timestamptz,
    }
}

diesel::table! {
    content (version) {
        version -> Int8,
        design_id -> Uuid,
        kind -> Text,
        data -> Text,
        created_by -> Text,
        created_on -> Timestamptz,
        reverted -> Bool,
    }
}

diesel::table! {
    acl (design_id, user_id) {
        design_id -> Uuid,
        user_id -> Text,
        role -> Text,
    }
}

diesel::table! {
    acl_invites (invite_id) {
        invite_id -> Uuid,
        design_id -> Uuid,
        role -> Text,
        status -> Text,
        created_by -> Text,
        created_on -> Timestamptz,
        subject -> Text,
        modified_by -> Nullable<Text>,
        modified_on -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    editing_sessions (uuid) {
        uuid -> Uuid,
        design_id -> Uuid,
        user_id -> Text,
        secret_hash -> Text,
        version -> Int8,
        expires_on -> Timestamptz,
    }
}

diesel::table! {
    sharing (design_id) {
        design_id -> Uuid,
        uuid -> Uuid,
        level -> Text,
    }
}

diesel::joinable!(content -> designs (design_id));
diesel::joinable!(acl -> designs (design_id));
diesel::joinable!(acl_invites -> designs (design_id));
diesel::joinable!(sharing -> designs (design_id));

diesel::allow_tables_to_appear_in_same_query!(
    designs,
    content,
    acl,
    acl_invites,
    editing_sessions,
    sharing,
);
