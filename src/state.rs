use std::sync::Arc;

use mongodb::Collection;

use crate::auth::SessionKeys;
use crate::config::ServiceConfig;
use crate::email::Mailer;
use crate::product::Product;
use crate::user::User;

/// Service state containing database connections and shared collaborators.
#[derive(Clone)]
pub struct ServiceState {
    pub user_collection: Collection<User>,
    pub product_collection: Collection<Product>,
    pub session_keys: Arc<SessionKeys>,
    pub mailer: Arc<Mailer>,
    pub config: Arc<ServiceConfig>,
}
