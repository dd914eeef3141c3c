use diesel::{table, allow_tables_to_appear_in_same_query};

table! {
    push_subscriptions (id) {
        id -> Uuid,
        user_id -> Uuid,
        endpoint -> Text,
        p256dh -> Text,
        auth -> Text,
        created_at -> Timestamptz,
    }
}

table! {
    notifications (id) {
        id -> Uuid,
        user_id -> Uuid,
        title -> Text,
        message -> Text,
        #[sql_name = "type"]
        notification_type -> Text,
        is_read -> Nullable<Bool>,
        related_car_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

allow_tables_to_appear_in_same_query!(
    push_subscriptions,
    notifications,
);
