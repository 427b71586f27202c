use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use skylane_catalog::{FlightRepository, FlightStatus, InventoryError};
use skylane_core::events::EventPublisher;
use skylane_core::user::{User, UserRepository};
use skylane_loyalty::account::MilesAccount;
use skylane_loyalty::conversion;
use skylane_loyalty::transaction::TransactionType;
use skylane_loyalty::LedgerService;
use skylane_shared::{
    MilesUpdateEvent, WelcomeEmailEvent, MILES_UPDATES_TOPIC, WELCOME_EMAILS_TOPIC,
};

use crate::models::{Booking, BookingStatus};
use crate::payment::{split_payment, PaymentSplit};
use crate::reference::generate_booking_reference;
use crate::repository::BookingRepository;
use crate::BookingError;

const REFERENCE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct PurchaseRequest {
    pub user_id: Uuid,
    pub flight_id: Uuid,
    pub number_of_seats: i32,
    pub use_miles: bool,
    pub miles_amount: Decimal,
    pub become_member: bool,
}

#[derive(Debug, Serialize)]
pub struct PurchaseOutcome {
    pub booking: Booking,
    pub flight_number: String,
    pub remaining_miles: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct CancellationOutcome {
    pub booking: Booking,
    pub miles_refunded: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CompletionOutcome {
    pub flight_id: Uuid,
    pub credited_bookings: u32,
    pub total_miles: Decimal,
}

/// Orchestrates a purchase across the flight inventory, the miles ledger and
/// the booking store. Each downstream mutation is atomic on its own
/// aggregate; when a later step fails, the earlier effects are compensated
/// (seats released, miles re-credited) before the error surfaces.
pub struct BookingService {
    flights: Arc<dyn FlightRepository>,
    bookings: Arc<dyn BookingRepository>,
    users: Arc<dyn UserRepository>,
    ledger: LedgerService,
    events: Arc<dyn EventPublisher>,
}

impl BookingService {
    pub fn new(
        flights: Arc<dyn FlightRepository>,
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserRepository>,
        ledger: LedgerService,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            flights,
            bookings,
            users,
            ledger,
            events,
        }
    }

    pub async fn purchase(&self, req: PurchaseRequest) -> Result<PurchaseOutcome, BookingError> {
        if req.number_of_seats < 1 {
            return Err(BookingError::InvalidSeatCount(req.number_of_seats));
        }

        let user = self
            .users
            .find(req.user_id)
            .await
            .map_err(BookingError::Storage)?
            .ok_or(BookingError::UserNotFound(req.user_id))?;
        let flight = self
            .flights
            .find(req.flight_id)
            .await
            .map_err(BookingError::Storage)?
            .ok_or(BookingError::FlightNotFound(req.flight_id))?;
        if matches!(
            flight.status,
            FlightStatus::Cancelled | FlightStatus::Completed
        ) {
            return Err(BookingError::FlightNotBookable(flight.id));
        }

        let total_price = flight.price * Decimal::from(req.number_of_seats);

        // Advisory pre-check; the conditional decrement below re-enforces it
        // against concurrent purchases.
        let available = flight.available_seats();
        if available < req.number_of_seats {
            return Err(InventoryError::InsufficientCapacity {
                requested: req.number_of_seats,
                available,
            }
            .into());
        }

        // First opt-in creates the loyalty account.
        let mut account = self.ledger.account_for_user(user.id).await?;
        if account.is_none() && req.become_member {
            let created = self.ledger.enroll(user.id).await?;
            info!(
                "Enrolled user {} as member {}",
                user.id, created.member_number
            );
            self.publish_welcome(&user, &created).await;
            account = Some(created);
        }

        let booking_id = Uuid::new_v4();
        let mut split = PaymentSplit::cash_only(total_price);
        let mut remaining_miles = None;
        if req.use_miles && req.miles_amount > Decimal::ZERO {
            if let Some(acct) = account.clone() {
                if acct.miles_balance > Decimal::ZERO {
                    split = split_payment(total_price, req.miles_amount);
                    if split.miles_used > Decimal::ZERO {
                        let update = self
                            .ledger
                            .debit(
                                acct.id,
                                split.miles_used,
                                format!("Redemption for flight {}", flight.flight_number),
                                Some(flight.id),
                                Some(booking_id),
                            )
                            .await?;
                        remaining_miles = Some(update.account.miles_balance);
                        account = Some(update.account);
                    }
                }
            }
        }

        // Take the seats. Losing the race here unwinds the debit.
        if let Err(err) = self
            .flights
            .book_seats(flight.id, req.number_of_seats)
            .await
        {
            self.refund_miles(&account, &split, flight.id, booking_id, "seat allocation failed")
                .await;
            return Err(err.into());
        }

        let mut booking = Booking {
            id: booking_id,
            flight_id: flight.id,
            user_id: user.id,
            number_of_seats: req.number_of_seats,
            total_price,
            status: BookingStatus::Confirmed,
            booking_reference: generate_booking_reference(),
            payment_method: split.method,
            miles_used: split.miles_used,
            cash_amount: split.cash_amount,
            created_at: Utc::now(),
        };

        let mut attempts = 0;
        let persisted = loop {
            match self.bookings.create(&booking).await {
                Ok(b) => break b,
                Err(BookingError::DuplicateReference(reference))
                    if attempts + 1 < REFERENCE_ATTEMPTS =>
                {
                    attempts += 1;
                    warn!("Booking reference collision on {}, regenerating", reference);
                    booking.booking_reference = generate_booking_reference();
                }
                Err(err) => {
                    if let Err(release_err) = self
                        .flights
                        .release_seats(flight.id, req.number_of_seats)
                        .await
                    {
                        error!(
                            "Failed to release seats after booking failure: {}",
                            release_err
                        );
                    }
                    self.refund_miles(
                        &account,
                        &split,
                        flight.id,
                        booking_id,
                        "booking persistence failed",
                    )
                    .await;
                    return Err(err);
                }
            }
        };

        info!(
            "Booking {} confirmed: {} seat(s) on {} paid {}",
            persisted.booking_reference,
            persisted.number_of_seats,
            flight.flight_number,
            persisted.payment_method.as_str()
        );

        // Confirmation notification rides the miles queue when miles moved.
        if persisted.miles_used > Decimal::ZERO {
            if let Some(acct) = &account {
                self.publish_miles_update(
                    &user,
                    acct,
                    -persisted.miles_used,
                    Some(flight.id),
                    Some(format!("Booking {} confirmed", persisted.booking_reference)),
                )
                .await;
            }
        }

        Ok(PurchaseOutcome {
            booking: persisted,
            flight_number: flight.flight_number,
            remaining_miles,
        })
    }

    pub async fn cancel(
        &self,
        booking_id: Uuid,
        caller_id: Uuid,
    ) -> Result<CancellationOutcome, BookingError> {
        let booking = self
            .bookings
            .find(booking_id)
            .await
            .map_err(BookingError::Storage)?
            .ok_or(BookingError::NotFound(booking_id))?;
        if booking.user_id != caller_id {
            return Err(BookingError::NotOwner);
        }

        // Conditional transition: only one of two racing cancels wins, so the
        // seat restore and the refund below run exactly once.
        let cancelled = self.bookings.mark_cancelled(booking_id).await?;

        if let Err(err) = self
            .flights
            .release_seats(cancelled.flight_id, cancelled.number_of_seats)
            .await
        {
            error!(
                "Failed to restore seats for cancelled booking {}: {}",
                cancelled.booking_reference, err
            );
        }

        let mut miles_refunded = Decimal::ZERO;
        if cancelled.miles_used > Decimal::ZERO {
            match self.ledger.account_for_user(cancelled.user_id).await {
                Ok(Some(account)) => {
                    let refund = self
                        .ledger
                        .credit(
                            account.id,
                            cancelled.miles_used,
                            TransactionType::Adjustment,
                            format!(
                                "Refund for cancelled booking {}",
                                cancelled.booking_reference
                            ),
                            Some(cancelled.flight_id),
                            Some(cancelled.id),
                        )
                        .await;
                    match refund {
                        Ok(update) => {
                            miles_refunded = cancelled.miles_used;
                            if let Ok(Some(user)) = self.users.find(cancelled.user_id).await {
                                self.publish_miles_update(
                                    &user,
                                    &update.account,
                                    cancelled.miles_used,
                                    Some(cancelled.flight_id),
                                    Some(format!(
                                        "Booking {} cancelled",
                                        cancelled.booking_reference
                                    )),
                                )
                                .await;
                            }
                        }
                        Err(err) => error!(
                            "Failed to refund miles for booking {}: {}",
                            cancelled.booking_reference, err
                        ),
                    }
                }
                Ok(None) => error!(
                    "No miles account to refund for booking {}",
                    cancelled.booking_reference
                ),
                Err(err) => error!("Failed to load miles account for refund: {}", err),
            }
        }

        info!("Booking {} cancelled", cancelled.booking_reference);

        Ok(CancellationOutcome {
            booking: cancelled,
            miles_refunded,
        })
    }

    pub async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        self.bookings
            .list_for_user(user_id)
            .await
            .map_err(BookingError::Storage)
    }

    /// Marks the flight completed and credits earned miles for its confirmed
    /// bookings: one mile per dollar of the cash portion, floored. Bookings
    /// that already have an earn entry are skipped, so the sweep can be
    /// re-run safely.
    pub async fn complete_flight(
        &self,
        flight_id: Uuid,
    ) -> Result<CompletionOutcome, BookingError> {
        let flight = self
            .flights
            .find(flight_id)
            .await
            .map_err(BookingError::Storage)?
            .ok_or(BookingError::FlightNotFound(flight_id))?;
        if flight.status == FlightStatus::Cancelled {
            return Err(BookingError::FlightCancelled(flight_id));
        }

        self.flights
            .set_status(flight_id, FlightStatus::Completed)
            .await
            .map_err(BookingError::Storage)?;

        let bookings = self
            .bookings
            .confirmed_for_flight(flight_id)
            .await
            .map_err(BookingError::Storage)?;

        let mut credited_bookings = 0u32;
        let mut total_miles = Decimal::ZERO;
        for booking in bookings {
            let miles = conversion::earned_miles(booking.cash_amount);
            if miles <= Decimal::ZERO {
                continue;
            }
            let account = match self.ledger.account_for_user(booking.user_id).await? {
                Some(account) => account,
                None => continue,
            };
            if self.ledger.earn_exists_for_booking(booking.id).await? {
                continue;
            }
            let credit = self
                .ledger
                .credit(
                    account.id,
                    miles,
                    TransactionType::Earn,
                    format!("Miles earned on flight {}", flight.flight_number),
                    Some(flight_id),
                    Some(booking.id),
                )
                .await;
            match credit {
                Ok(update) => {
                    credited_bookings += 1;
                    total_miles += miles;
                    if let Ok(Some(user)) = self.users.find(booking.user_id).await {
                        self.publish_miles_update(
                            &user,
                            &update.account,
                            miles,
                            Some(flight_id),
                            Some(format!("Flight {} completed", flight.flight_number)),
                        )
                        .await;
                    }
                }
                Err(err) => error!(
                    "Failed to credit earned miles for booking {}: {}",
                    booking.booking_reference, err
                ),
            }
        }

        info!(
            "Flight {} completed: credited {} booking(s)",
            flight.flight_number, credited_bookings
        );

        Ok(CompletionOutcome {
            flight_id,
            credited_bookings,
            total_miles,
        })
    }

    /// Best-effort compensation for a debit whose purchase later failed.
    async fn refund_miles(
        &self,
        account: &Option<MilesAccount>,
        split: &PaymentSplit,
        flight_id: Uuid,
        booking_id: Uuid,
        cause: &str,
    ) {
        if split.miles_used <= Decimal::ZERO {
            return;
        }
        let Some(acct) = account else {
            return;
        };
        if let Err(err) = self
            .ledger
            .credit(
                acct.id,
                split.miles_used,
                TransactionType::Adjustment,
                format!("Reversal: {}", cause),
                Some(flight_id),
                Some(booking_id),
            )
            .await
        {
            error!(
                "Failed to reverse miles debit for member {}: {}",
                acct.member_number, err
            );
        }
    }

    /// Best-effort queue publish; a broker failure never fails the request.
    async fn publish_welcome(&self, user: &User, account: &MilesAccount) {
        let event = WelcomeEmailEvent {
            member_id: account.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            member_number: account.member_number.clone(),
            enqueued_at: Utc::now().timestamp(),
        };
        match serde_json::to_string(&event) {
            Ok(payload) => {
                if let Err(err) = self
                    .events
                    .publish(WELCOME_EMAILS_TOPIC, &account.member_number, &payload)
                    .await
                {
                    error!(
                        "Failed to enqueue welcome email for {}: {}",
                        account.member_number, err
                    );
                }
            }
            Err(err) => error!("Failed to serialize welcome event: {}", err),
        }
    }

    async fn publish_miles_update(
        &self,
        user: &User,
        account: &MilesAccount,
        miles_delta: Decimal,
        flight_id: Option<Uuid>,
        reason: Option<String>,
    ) {
        let event = MilesUpdateEvent {
            member_id: account.id,
            email: user.email.clone(),
            miles_delta,
            new_balance: account.miles_balance,
            flight_id,
            airline_code: None,
            reason,
            enqueued_at: Utc::now().timestamp(),
        };
        match serde_json::to_string(&event) {
            Ok(payload) => {
                if let Err(err) = self
                    .events
                    .publish(MILES_UPDATES_TOPIC, &account.member_number, &payload)
                    .await
                {
                    error!(
                        "Failed to enqueue miles update for {}: {}",
                        account.member_number, err
                    );
                }
            }
            Err(err) => error!("Failed to serialize miles update event: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBookingStore;
    use crate::models::PaymentMethod;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use skylane_catalog::flight::Flight;
    use skylane_catalog::memory::InMemoryFlightInventory;
    use skylane_core::memory::{InMemoryUserDirectory, RecordingEventPublisher};
    use skylane_loyalty::memory::InMemoryMilesLedger;
    use skylane_loyalty::LoyaltyError;
    use skylane_shared::{MILES_UPDATES_TOPIC, WELCOME_EMAILS_TOPIC};

    struct Harness {
        service: BookingService,
        flights: Arc<InMemoryFlightInventory>,
        bookings: Arc<InMemoryBookingStore>,
        users: Arc<InMemoryUserDirectory>,
        ledger: LedgerService,
        publisher: Arc<RecordingEventPublisher>,
    }

    fn harness() -> Harness {
        let flights = Arc::new(InMemoryFlightInventory::new());
        let bookings = Arc::new(InMemoryBookingStore::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let ledger = LedgerService::new(Arc::new(InMemoryMilesLedger::new()));
        let publisher = Arc::new(RecordingEventPublisher::new());

        let service = BookingService::new(
            flights.clone(),
            bookings.clone(),
            users.clone(),
            ledger.clone(),
            publisher.clone(),
        );

        Harness {
            service,
            flights,
            bookings,
            users,
            ledger,
            publisher,
        }
    }

    async fn seed_user(harness: &Harness) -> User {
        let user = User::new(
            Uuid::new_v4(),
            "pax@example.com".to_string(),
            "Test Passenger".to_string(),
            "user".to_string(),
        );
        harness.users.upsert(&user).await.unwrap();
        user
    }

    fn seed_flight(harness: &Harness, price: Decimal, capacity: i32, booked: i32) -> Flight {
        let departure = Utc::now() + Duration::days(7);
        let mut flight = Flight::new(
            "SL101".to_string(),
            "IST".to_string(),
            "LHR".to_string(),
            departure,
            departure + Duration::hours(4),
            capacity,
            price,
        );
        flight.booked_seats = booked;
        harness.flights.seed(flight.clone());
        flight
    }

    fn request(user_id: Uuid, flight_id: Uuid, seats: i32) -> PurchaseRequest {
        PurchaseRequest {
            user_id,
            flight_id,
            number_of_seats: seats,
            use_miles: false,
            miles_amount: Decimal::ZERO,
            become_member: false,
        }
    }

    #[tokio::test]
    async fn test_cash_purchase_decrements_seats() {
        let h = harness();
        let user = seed_user(&h).await;
        let flight = seed_flight(&h, dec!(120.00), 100, 10);

        let outcome = h
            .service
            .purchase(request(user.id, flight.id, 3))
            .await
            .unwrap();

        assert_eq!(outcome.booking.status, BookingStatus::Confirmed);
        assert_eq!(outcome.booking.total_price, dec!(360.00));
        assert_eq!(outcome.booking.payment_method, PaymentMethod::Cash);
        assert_eq!(outcome.booking.cash_amount, dec!(360.00));
        assert_eq!(outcome.booking.booking_reference.len(), 6);
        assert_eq!(outcome.remaining_miles, None);

        let updated = h.flights.find(flight.id).await.unwrap().unwrap();
        assert_eq!(updated.booked_seats, 13);
        // Cash-only purchase by a non-member produces no notification.
        assert!(h.publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_over_capacity_purchase_leaves_state_untouched() {
        let h = harness();
        let user = seed_user(&h).await;
        let flight = seed_flight(&h, dec!(99.00), 50, 48);

        let err = h
            .service
            .purchase(request(user.id, flight.id, 3))
            .await
            .unwrap_err();
        match err {
            BookingError::Inventory(InventoryError::InsufficientCapacity {
                requested,
                available,
            }) => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        let unchanged = h.flights.find(flight.id).await.unwrap().unwrap();
        assert_eq!(unchanged.booked_seats, 48);
        assert_eq!(h.bookings.count(), 0);
    }

    #[tokio::test]
    async fn test_mixed_payment_debits_ledger() {
        let h = harness();
        let user = seed_user(&h).await;
        let flight = seed_flight(&h, dec!(100.00), 100, 0);
        let account = h.ledger.enroll(user.id).await.unwrap();
        h.ledger
            .credit(
                account.id,
                dec!(5000),
                TransactionType::Earn,
                "Seed".to_string(),
                None,
                None,
            )
            .await
            .unwrap();

        let mut req = request(user.id, flight.id, 1);
        req.use_miles = true;
        req.miles_amount = dec!(3000);
        let outcome = h.service.purchase(req).await.unwrap();

        assert_eq!(outcome.booking.payment_method, PaymentMethod::Mixed);
        assert_eq!(outcome.booking.miles_used, dec!(3000));
        assert_eq!(outcome.booking.cash_amount, dec!(70.00));
        assert_eq!(outcome.remaining_miles, Some(dec!(2000)));
        assert_eq!(h.ledger.balance(account.id).await.unwrap(), dec!(2000));

        let entries = h.ledger.transactions(account.id).await.unwrap();
        assert_eq!(entries[0].miles_amount, dec!(-3000));
        assert_eq!(entries[0].transaction_type, TransactionType::Redeem);
        assert_eq!(entries[0].booking_id, Some(outcome.booking.id));

        assert_eq!(h.publisher.topics(), vec![MILES_UPDATES_TOPIC.to_string()]);
    }

    #[tokio::test]
    async fn test_full_miles_payment_consumes_exact_need() {
        let h = harness();
        let user = seed_user(&h).await;
        let flight = seed_flight(&h, dec!(50.00), 100, 0);
        let account = h.ledger.enroll(user.id).await.unwrap();
        h.ledger
            .credit(
                account.id,
                dec!(6000),
                TransactionType::Earn,
                "Seed".to_string(),
                None,
                None,
            )
            .await
            .unwrap();

        let mut req = request(user.id, flight.id, 1);
        req.use_miles = true;
        req.miles_amount = dec!(10000);
        let outcome = h.service.purchase(req).await.unwrap();

        assert_eq!(outcome.booking.payment_method, PaymentMethod::Miles);
        assert_eq!(outcome.booking.miles_used, dec!(5000));
        assert_eq!(outcome.booking.cash_amount, dec!(0));
        assert_eq!(outcome.remaining_miles, Some(dec!(1000)));
    }

    #[tokio::test]
    async fn test_insufficient_miles_fails_whole_purchase() {
        let h = harness();
        let user = seed_user(&h).await;
        let flight = seed_flight(&h, dec!(100.00), 100, 20);
        let account = h.ledger.enroll(user.id).await.unwrap();
        h.ledger
            .credit(
                account.id,
                dec!(2000),
                TransactionType::Earn,
                "Seed".to_string(),
                None,
                None,
            )
            .await
            .unwrap();

        let mut req = request(user.id, flight.id, 1);
        req.use_miles = true;
        req.miles_amount = dec!(3000);
        let err = h.service.purchase(req).await.unwrap_err();
        assert!(matches!(
            err,
            BookingError::Loyalty(LoyaltyError::InsufficientBalance { .. })
        ));

        // Nothing moved: seats, balance and booking store are untouched.
        let unchanged = h.flights.find(flight.id).await.unwrap().unwrap();
        assert_eq!(unchanged.booked_seats, 20);
        assert_eq!(h.ledger.balance(account.id).await.unwrap(), dec!(2000));
        assert_eq!(h.bookings.count(), 0);
    }

    #[tokio::test]
    async fn test_become_member_enrolls_and_sends_welcome() {
        let h = harness();
        let user = seed_user(&h).await;
        let flight = seed_flight(&h, dec!(75.00), 100, 0);

        let mut req = request(user.id, flight.id, 2);
        req.become_member = true;
        let outcome = h.service.purchase(req).await.unwrap();

        // Fresh accounts hold no miles, so the purchase stays cash-only.
        assert_eq!(outcome.booking.payment_method, PaymentMethod::Cash);
        let account = h.ledger.account_for_user(user.id).await.unwrap().unwrap();
        assert_eq!(account.miles_balance, Decimal::ZERO);
        assert_eq!(h.publisher.topics(), vec![WELCOME_EMAILS_TOPIC.to_string()]);
    }

    #[tokio::test]
    async fn test_purchase_unknown_user_or_flight() {
        let h = harness();
        let user = seed_user(&h).await;
        let flight = seed_flight(&h, dec!(75.00), 100, 0);

        let err = h
            .service
            .purchase(request(Uuid::new_v4(), flight.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::UserNotFound(_)));

        let err = h
            .service
            .purchase(request(user.id, Uuid::new_v4(), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::FlightNotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_restores_seats_and_refunds_miles() {
        let h = harness();
        let user = seed_user(&h).await;
        let flight = seed_flight(&h, dec!(100.00), 100, 40);
        let account = h.ledger.enroll(user.id).await.unwrap();
        h.ledger
            .credit(
                account.id,
                dec!(5000),
                TransactionType::Earn,
                "Seed".to_string(),
                None,
                None,
            )
            .await
            .unwrap();

        let mut req = request(user.id, flight.id, 2);
        req.use_miles = true;
        req.miles_amount = dec!(3000);
        let outcome = h.service.purchase(req).await.unwrap();
        assert_eq!(
            h.flights.find(flight.id).await.unwrap().unwrap().booked_seats,
            42
        );

        let cancellation = h
            .service
            .cancel(outcome.booking.id, user.id)
            .await
            .unwrap();
        assert_eq!(cancellation.booking.status, BookingStatus::Cancelled);
        assert_eq!(cancellation.miles_refunded, dec!(3000));

        let restored = h.flights.find(flight.id).await.unwrap().unwrap();
        assert_eq!(restored.booked_seats, 40);
        assert_eq!(h.ledger.balance(account.id).await.unwrap(), dec!(5000));

        let entries = h.ledger.transactions(account.id).await.unwrap();
        assert_eq!(entries[0].transaction_type, TransactionType::Adjustment);
        assert_eq!(entries[0].miles_amount, dec!(3000));
    }

    #[tokio::test]
    async fn test_double_cancel_is_rejected() {
        let h = harness();
        let user = seed_user(&h).await;
        let flight = seed_flight(&h, dec!(60.00), 100, 0);

        let outcome = h
            .service
            .purchase(request(user.id, flight.id, 1))
            .await
            .unwrap();
        h.service.cancel(outcome.booking.id, user.id).await.unwrap();

        let err = h
            .service
            .cancel(outcome.booking.id, user.id)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::AlreadyCancelled(_)));

        // The second attempt must not restore seats a second time.
        let after = h.flights.find(flight.id).await.unwrap().unwrap();
        assert_eq!(after.booked_seats, 0);
    }

    #[tokio::test]
    async fn test_cancel_requires_ownership() {
        let h = harness();
        let user = seed_user(&h).await;
        let flight = seed_flight(&h, dec!(60.00), 100, 0);

        let outcome = h
            .service
            .purchase(request(user.id, flight.id, 1))
            .await
            .unwrap();
        let err = h
            .service
            .cancel(outcome.booking.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::NotOwner));
    }

    #[tokio::test]
    async fn test_flight_completion_credits_earned_miles_once() {
        let h = harness();
        let user = seed_user(&h).await;
        let flight = seed_flight(&h, dec!(120.40), 200, 0);
        h.ledger.enroll(user.id).await.unwrap();

        let outcome = h
            .service
            .purchase(request(user.id, flight.id, 1))
            .await
            .unwrap();
        assert_eq!(outcome.booking.cash_amount, dec!(120.40));

        let completion = h.service.complete_flight(flight.id).await.unwrap();
        assert_eq!(completion.credited_bookings, 1);
        assert_eq!(completion.total_miles, dec!(120));

        let account = h.ledger.account_for_user(user.id).await.unwrap().unwrap();
        assert_eq!(account.miles_balance, dec!(120));
        let entries = h.ledger.transactions(account.id).await.unwrap();
        assert_eq!(entries[0].transaction_type, TransactionType::Earn);
        assert_eq!(entries[0].miles_amount, dec!(120));

        // Re-running the sweep must not double-credit.
        let again = h.service.complete_flight(flight.id).await.unwrap();
        assert_eq!(again.credited_bookings, 0);
        assert_eq!(account.miles_balance, dec!(120));

        let updated = h.flights.find(flight.id).await.unwrap().unwrap();
        assert_eq!(updated.status, FlightStatus::Completed);
    }

    #[tokio::test]
    async fn test_purchase_rejected_on_cancelled_flight() {
        let h = harness();
        let user = seed_user(&h).await;
        let flight = seed_flight(&h, dec!(60.00), 100, 0);
        h.flights
            .set_status(flight.id, FlightStatus::Cancelled)
            .await
            .unwrap();

        let err = h
            .service
            .purchase(request(user.id, flight.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::FlightNotBookable(_)));
    }
}
