use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions, ServerApi, ServerApiVersion},
    Client, Collection, IndexModel,
};

use super::store::{BookingStore, ListingStore, StoreError};
use crate::models::{bookings::Booking, listing::Listing};

const DUPLICATE_KEY: i32 = 11000;

pub async fn create_mongo_client(uri: &str) -> Result<Arc<Client>, StoreError> {
    log::info!("Connecting to MongoDB");

    let mut client_options = ClientOptions::parse(uri)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to parse MongoDB URI: {}", e)))?;

    client_options.connect_timeout = Some(Duration::from_secs(10));
    client_options.server_selection_timeout = Some(Duration::from_secs(10));
    client_options.max_pool_size = Some(10);
    client_options.min_pool_size = Some(1);

    let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
    client_options.server_api = Some(server_api);

    let client = Client::with_options(client_options)
        .map_err(|e| StoreError::Database(e.to_string()))?;

    // The API can start without a reachable server; requests will fail until it is.
    match client.database("admin").run_command(doc! {"ping": 1}).await {
        Ok(_) => log::info!("Successfully connected to MongoDB and verified with ping command"),
        Err(e) => log::warn!("Connected to MongoDB but ping test failed: {}", e),
    }

    Ok(Arc::new(client))
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY
        }
        _ => false,
    }
}

fn db_error(err: MongoError) -> StoreError {
    StoreError::Database(err.to_string())
}

#[derive(Clone)]
pub struct MongoStore {
    client: Arc<Client>,
    database: String,
}

impl MongoStore {
    pub fn new(client: Arc<Client>, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
        }
    }

    fn bookings(&self) -> Collection<Booking> {
        self.client.database(&self.database).collection("Bookings")
    }

    fn listings(&self) -> Collection<Listing> {
        self.client.database(&self.database).collection("Listings")
    }

    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique = || IndexOptions::builder().unique(true).build();

        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "idempotency_key": 1 })
                .options(unique())
                .build(),
            IndexModel::builder()
                .keys(doc! { "confirmation_number": 1 })
                .options(unique())
                .build(),
            IndexModel::builder()
                .keys(doc! { "payment_intent_id": 1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "created_at": -1 })
                .build(),
        ];

        self.bookings()
            .create_indexes(indexes)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MongoStore {
    async fn insert_or_get(&self, booking: Booking) -> Result<Booking, StoreError> {
        if let Some(existing) = self.find_by_idempotency_key(&booking.idempotency_key).await? {
            return Ok(existing);
        }

        let mut booking = booking;
        match self.bookings().insert_one(&booking).await {
            Ok(result) => {
                booking.id = result.inserted_id.as_object_id();
                Ok(booking)
            }
            Err(err) if is_duplicate_key(&err) => {
                // Either a concurrent replay won the race or the confirmation number collided.
                match self.find_by_idempotency_key(&booking.idempotency_key).await? {
                    Some(existing) => Ok(existing),
                    None => Err(StoreError::DuplicateConfirmation),
                }
            }
            Err(err) => {
                log::error!("Failed to insert booking: {:?}", err);
                Err(db_error(err))
            }
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, StoreError> {
        let object_id =
            ObjectId::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))?;
        self.bookings()
            .find_one(doc! { "_id": object_id })
            .await
            .map_err(db_error)
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Booking>, StoreError> {
        self.bookings()
            .find_one(doc! { "idempotency_key": key })
            .await
            .map_err(db_error)
    }

    async fn find_by_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<Booking>, StoreError> {
        self.bookings()
            .find_one(doc! { "payment_intent_id": intent_id })
            .await
            .map_err(db_error)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Booking>, StoreError> {
        let cursor = self
            .bookings()
            .find(doc! { "user_id": user_id })
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(db_error)?;
        cursor.try_collect::<Vec<Booking>>().await.map_err(db_error)
    }

    async fn replace(&self, booking: &Booking) -> Result<(), StoreError> {
        let id = booking
            .id
            .ok_or_else(|| StoreError::InvalidId("booking has no id".to_string()))?;

        let result = self
            .bookings()
            .replace_one(doc! { "_id": id }, booking)
            .await
            .map_err(db_error)?;

        if result.matched_count == 0 {
            return Err(StoreError::InvalidId(id.to_hex()));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database(&self.database)
            .run_command(doc! {"ping": 1})
            .await
            .map(|_| ())
            .map_err(db_error)
    }
}

#[async_trait]
impl ListingStore for MongoStore {
    async fn get_listing(&self, id: i64) -> Result<Option<Listing>, StoreError> {
        self.listings()
            .find_one(doc! { "_id": id })
            .await
            .map_err(db_error)
    }

    async fn upsert_listing(&self, listing: &Listing) -> Result<(), StoreError> {
        self.listings()
            .replace_one(doc! { "_id": listing.id }, listing)
            .upsert(true)
            .await
            .map(|_| ())
            .map_err(db_error)
    }
}
