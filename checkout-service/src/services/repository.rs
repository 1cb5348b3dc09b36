use crate::models::{
    Course, CoursePricing, Customer, CustomerStatus, OrderStatus, PaymentOrder, PaymentProvider,
    PaymentTransaction,
};
use anyhow::Result;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{
    bson::{doc, to_bson, DateTime},
    Client, Collection, Database, IndexModel,
};
use uuid::Uuid;

#[derive(Clone)]
pub struct CheckoutRepository {
    client: Client,
    orders: Collection<PaymentOrder>,
    transactions: Collection<PaymentTransaction>,
    customers: Collection<Customer>,
    courses: Collection<Course>,
    pricing: Collection<CoursePricing>,
    coupons: Collection<mongodb::bson::Document>,
}

impl CheckoutRepository {
    pub fn new(client: &Client, db: &Database) -> Self {
        Self {
            client: client.clone(),
            orders: db.collection("orders"),
            transactions: db.collection("transactions"),
            customers: db.collection("customers"),
            courses: db.collection("courses"),
            pricing: db.collection("course_pricing"),
            coupons: db.collection("coupons"),
        }
    }

    /// Initialize indexes. The unique index on `provider_payment_id` is the
    /// idempotency backstop for retried verification callbacks; the unique
    /// index on coupon codes enforces case-normalized uniqueness.
    pub async fn init_indexes(&self) -> Result<()> {
        let payment_id_index = IndexModel::builder()
            .keys(doc! { "provider_payment_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("unique_provider_payment_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();
        self.transactions
            .create_index(payment_id_index, None)
            .await?;

        let provider_order_index = IndexModel::builder()
            .keys(doc! { "provider": 1, "provider_order_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("provider_order_idx".to_string())
                    .build(),
            )
            .build();
        self.orders.create_index(provider_order_index, None).await?;

        let coupon_code_index = IndexModel::builder()
            .keys(doc! { "code": 1 })
            .options(
                IndexOptions::builder()
                    .name("unique_coupon_code_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();
        self.coupons.create_index(coupon_code_index, None).await?;

        let customer_email_index = IndexModel::builder()
            .keys(doc! { "email": 1, "course_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("customer_email_course_idx".to_string())
                    .build(),
            )
            .build();
        self.customers
            .create_index(customer_email_index, None)
            .await?;

        tracing::info!("Checkout service indexes initialized");
        Ok(())
    }

    pub async fn get_course(&self, course_id: &str) -> Result<Option<Course>> {
        let course = self.courses.find_one(doc! { "_id": course_id }, None).await?;
        Ok(course)
    }

    pub async fn get_current_price(&self, course_id: &str) -> Result<Option<f64>> {
        let pricing = self
            .pricing
            .find_one(doc! { "course_id": course_id }, None)
            .await?;
        Ok(pricing.map(|p| p.current))
    }

    pub async fn create_order(&self, order: &PaymentOrder) -> Result<()> {
        self.orders.insert_one(order, None).await?;
        Ok(())
    }

    pub async fn find_order_by_provider_order_id(
        &self,
        provider: PaymentProvider,
        provider_order_id: &str,
    ) -> Result<Option<PaymentOrder>> {
        let filter = doc! {
            "provider": to_bson(&provider)?,
            "provider_order_id": provider_order_id,
        };
        let order = self.orders.find_one(filter, None).await?;
        Ok(order)
    }

    /// Idempotency lookup keyed on the provider payment id.
    pub async fn find_transaction_by_payment_id(
        &self,
        provider_payment_id: &str,
    ) -> Result<Option<PaymentTransaction>> {
        let filter = doc! { "provider_payment_id": provider_payment_id };
        let transaction = self.transactions.find_one(filter, None).await?;
        Ok(transaction)
    }

    /// Mark the order paid (backfilling provider ids) and insert the
    /// immutable transaction record.
    ///
    /// Both writes run inside one multi-document session transaction so a
    /// paid order can never exist without its audit trail. Deployments
    /// without transaction support (standalone servers) fall back to
    /// sequential writes with a warning.
    pub async fn finalize_paid_order(
        &self,
        order_id: Uuid,
        provider_payment_id: &str,
        provider_signature: Option<&str>,
        transaction: &PaymentTransaction,
    ) -> Result<()> {
        let filter = doc! { "_id": order_id.to_string() };
        let mut set = doc! {
            "status": to_bson(&OrderStatus::Paid)?,
            "provider_payment_id": provider_payment_id,
            "updated_at": DateTime::now(),
        };
        if let Some(signature) = provider_signature {
            set.insert("provider_signature", signature);
        }
        let update = doc! { "$set": set };

        match self.finalize_in_transaction(&filter, &update, transaction).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    order_id = %order_id,
                    "Session transaction unavailable, falling back to sequential writes"
                );
                self.orders
                    .update_one(filter.clone(), update.clone(), None)
                    .await?;
                self.transactions.insert_one(transaction, None).await?;
                Ok(())
            }
        }
    }

    async fn finalize_in_transaction(
        &self,
        filter: &mongodb::bson::Document,
        update: &mongodb::bson::Document,
        transaction: &PaymentTransaction,
    ) -> Result<()> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = async {
            self.orders
                .update_one_with_session(filter.clone(), update.clone(), None, &mut session)
                .await?;
            self.transactions
                .insert_one_with_session(transaction, None, &mut session)
                .await?;
            Ok::<(), mongodb::error::Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                session.commit_transaction().await?;
                Ok(())
            }
            Err(e) => {
                session.abort_transaction().await.ok();
                Err(e.into())
            }
        }
    }

    /// Flip an order to `failed` by provider order id (webhook path).
    /// Returns whether a matching order existed.
    pub async fn mark_order_failed(&self, provider_order_id: &str) -> Result<bool> {
        let filter = doc! {
            "provider_order_id": provider_order_id,
            "status": to_bson(&OrderStatus::Created)?,
        };
        let update = doc! {
            "$set": {
                "status": to_bson(&OrderStatus::Failed)?,
                "updated_at": DateTime::now(),
            }
        };
        let result = self.orders.update_one(filter, update, None).await?;
        Ok(result.matched_count > 0)
    }

    pub async fn create_customer(&self, customer: &Customer) -> Result<()> {
        self.customers.insert_one(customer, None).await?;
        Ok(())
    }

    pub async fn find_customer(&self, email: &str, course_id: &str) -> Result<Option<Customer>> {
        let filter = doc! { "email": email, "course_id": course_id };
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .limit(1)
            .build();
        use futures::TryStreamExt;
        let mut cursor = self.customers.find(filter, Some(options)).await?;
        Ok(cursor.try_next().await?)
    }

    pub async fn list_customers(
        &self,
        status_filter: Option<CustomerStatus>,
        limit: i64,
        offset: u64,
    ) -> Result<(Vec<Customer>, i64)> {
        use futures::TryStreamExt;

        let mut filter = doc! {};
        if let Some(status) = status_filter {
            filter.insert("status", to_bson(&status)?);
        }

        let total_count = self.customers.count_documents(filter.clone(), None).await? as i64;

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(offset)
            .limit(limit)
            .build();
        let cursor = self.customers.find(filter, Some(options)).await?;
        let customers: Vec<Customer> = cursor.try_collect().await?;

        Ok((customers, total_count))
    }

    /// Advance the manual customer workflow. Returns whether the customer existed.
    pub async fn update_customer_status(&self, id: &str, status: CustomerStatus) -> Result<bool> {
        let filter = doc! { "_id": id };
        let update = doc! {
            "$set": {
                "status": to_bson(&status)?,
                "updated_at": DateTime::now(),
            }
        };
        let result = self.customers.update_one(filter, update, None).await?;
        Ok(result.matched_count > 0)
    }
}
