pub struct Icons;

impl Icons {
    pub const BOOKS: &str = "📚";
    pub const CHECK: &str = "✅";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const DATABASE: &str = "🗄️";
    pub const FILE: &str = "📄";
    pub const DEL: &str = "🗑️";
    pub const COMMENT: &str = "💬";
}
