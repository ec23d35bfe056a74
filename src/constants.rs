// Audit action names.
pub const EXPENSE_CREATED: &str = "EXPENSE_CREATED";
pub const EXPENSE_UPDATED: &str = "EXPENSE_UPDATED";
pub const EXPENSE_DELETED: &str = "EXPENSE_DELETED";
pub const PAYMENT_MARKED: &str = "PAYMENT_MARKED";
pub const PAYMENT_ACCEPTED: &str = "PAYMENT_ACCEPTED";
pub const PAYMENT_REJECTED: &str = "PAYMENT_REJECTED";
pub const MEMBER_LEFT: &str = "MEMBER_LEFT";

pub const MAX_CATEGORY_LENGTH: usize = 50;
pub const MAX_DESCRIPTION_LENGTH: usize = 255;
