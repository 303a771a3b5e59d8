use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::books::list_books,
        api::books::get_book,
        api::books::create_book,
        api::books::update_book,
        api::books::delete_book,
        api::books::adjust_copies,
        api::transactions::list_transactions,
        api::transactions::issue_book,
        api::transactions::return_book,
        api::transactions::sweep_overdue,
        api::members::member_history,
        api::stats::get_stats,
        api::stats::get_inventory_audit,
    ),
    components(
        schemas(
            crate::models::Book,
            crate::models::Transaction,
            crate::models::Member,
            crate::domain::TransactionStatus,
            crate::domain::Role,
            crate::domain::NewBook,
            crate::domain::BookUpdate,
            crate::domain::NewMember,
            crate::domain::LoanRecord,
            api::books::AdjustCopiesRequest,
            api::transactions::IssueBookRequest,
            crate::services::LibraryStats,
            crate::services::CategoryStats,
            crate::services::BorrowerSummary,
            crate::services::InventoryDiscrepancy,
        )
    ),
    tags(
        (name = "library-lending", description = "Library lending and inventory API")
    )
)]
pub struct ApiDoc;
