mod home;
mod product_detail;
mod search_results;
mod sign_in;
mod wishlist;

pub use home::HomeView;
pub use product_detail::ProductDetailView;
pub use search_results::SearchResultsView;
pub use sign_in::SignInView;
pub use wishlist::WishlistView;
