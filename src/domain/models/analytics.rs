use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Serialize, FromRow, Clone)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize, FromRow, Clone)]
pub struct ServiceBreakdown {
    pub service_name: String,
    pub bookings: i64,
    pub revenue: f64,
}

#[derive(Debug, Serialize, FromRow, Clone)]
pub struct MonthlyRevenue {
    pub month: String,
    pub bookings: i64,
    pub revenue: f64,
}

#[derive(Debug, Serialize, FromRow, Clone)]
pub struct TopTechnician {
    pub technician_id: String,
    pub name: String,
    pub average_rating: f64,
    pub rating_count: i64,
}

#[derive(Debug, Serialize, Clone, Default)]
pub struct DashboardStats {
    pub total_bookings: i64,
    pub total_customers: i64,
    pub total_technicians: i64,
    pub active_technicians: i64,
    pub total_revenue: f64,
    pub bookings_by_status: Vec<StatusCount>,
    pub services: Vec<ServiceBreakdown>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub top_technicians: Vec<TopTechnician>,
}
