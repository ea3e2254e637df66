use chrono::{Duration, Utc};
use clap::Parser;
use fake::{
    faker::{internet::en::SafeEmail, name::en::Name},
    Fake,
};
use lagoon::{
    domain::{
        BookingStatus, CreateBookingRequest, PaymentStateUpdate, PaymentStatus, RefundRecord,
        RefundStatus, SubmitProofRequest,
    },
    repository::{
        BookingRepository, PaymentProofRepository, SqliteBookingRepository,
        SqlitePaymentProofRepository,
    },
};
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePoolOptions;

/// Fills a database with demo bookings in every payment state.
#[derive(Parser)]
struct Args {
    #[arg(long, default_value = "sqlite://lagoon.db?mode=rwc")]
    database_url: String,

    #[arg(long, default_value_t = 12)]
    bookings: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("🌱 Starting database seeding...");

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    // Run migrations first
    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    let booking_repo = SqliteBookingRepository::new(db_pool.clone());
    let proof_repo = SqlitePaymentProofRepository::new(db_pool.clone());

    println!("🏝️  Creating bookings...");

    let today = Utc::now().date_naive();

    for i in 0..args.bookings {
        let check_in = today + Duration::days(1 + (i as i64 * 3) % 30);
        let nights = 1 + (i as i64 % 4);

        let booking = booking_repo.create(CreateBookingRequest {
            guest_name: Name().fake(),
            guest_email: SafeEmail().fake(),
            total_amount: Decimal::from(4500 + 1500 * (i as i64 % 6)),
            check_in_date: check_in,
            check_out_date: check_in + Duration::days(nights),
            payment_intent_id: Some(format!("pi_seed_{:04}", i)),
        }).await?;

        let label = match i % 6 {
            // Paid online and confirmed
            0 => {
                set_state(&booking_repo, booking.id, Some(PaymentStatus::Pending),
                    PaymentStatus::Paid, Some(BookingStatus::Confirmed)).await?;
                "paid"
            }
            // Bank transfer waiting for review
            1 => {
                proof_repo.create(booking.id, SubmitProofRequest {
                    payment_method: "bank_transfer".to_string(),
                    reference_number: Some(format!("BT-{:06}", 100000 + i)),
                }).await?;
                set_state(&booking_repo, booking.id, Some(PaymentStatus::Pending),
                    PaymentStatus::PaymentReview, None).await?;
                "payment review"
            }
            2 => {
                set_state(&booking_repo, booking.id, Some(PaymentStatus::Pending),
                    PaymentStatus::Failed, Some(BookingStatus::PaymentFailed)).await?;
                "payment failed"
            }
            // Paid then refunded
            3 => {
                set_state(&booking_repo, booking.id, Some(PaymentStatus::Pending),
                    PaymentStatus::Paid, Some(BookingStatus::Confirmed)).await?;
                booking_repo.claim_for_refund(booking.id).await?;
                booking_repo.complete_refund(booking.id, RefundRecord {
                    refund_id: format!("ref_seed_{:04}", i),
                    refund_amount: booking.total_amount / Decimal::new(2, 0),
                    refund_status: RefundStatus::Succeeded,
                    refund_reason: "requested_by_customer".to_string(),
                    refund_processed_by: "seed".to_string(),
                    refund_processed_at: Utc::now(),
                }).await?;
                "refunded"
            }
            4 => {
                booking_repo.cancel(booking.id).await?;
                "cancelled"
            }
            _ => "pending",
        };

        println!("  ✅ Booking #{} for {} ({})", booking.id, booking.guest_name, label);
    }

    println!("🎉 Seeded {} bookings", args.bookings);

    Ok(())
}

async fn set_state(
    repo: &SqliteBookingRepository,
    id: i64,
    expected: Option<PaymentStatus>,
    payment_status: PaymentStatus,
    status: Option<BookingStatus>,
) -> anyhow::Result<()> {
    repo.update_payment_state(id, expected, PaymentStateUpdate {
        payment_status: Some(payment_status),
        status,
    }).await?;
    Ok(())
}
