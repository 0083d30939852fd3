//! Built-in templates for the files that carry the project identity
//!
//! Tokens are substituted by [`crate::placeholders::render`].

/// Rendered into `.env`
pub const ENV_TEMPLATE: &str = r#"# Give your application a unique name (no spaces)
APP_NAME=${APP_NAME}
APP_URL=http://localhost:4000

# false for production, true for development
DEBUG=true

# the port should we listen on
PORT=4000

# the server name, e.g, www.mysite.com
SERVER_NAME=localhost

# should we use https?
SECURE=false

# database config - postgres or mysql
DATABASE_TYPE=
DATABASE_HOST=
DATABASE_PORT=
DATABASE_USER=
DATABASE_PASS=
DATABASE_NAME=
DATABASE_SSL_MODE=

# redis config
REDIS_HOST=
REDIS_PASSWORD=
REDIS_PREFIX=${APP_NAME}

# cache (currently only redis or badger)
CACHE=

# cookie settings
COOKIE_NAME=${APP_NAME}
COOKIE_LIFETIME=1
COOKIE_PERSIST=true
COOKIE_SECURE=false
COOKIE_DOMAIN=localhost

# session store: cookie, redis, mysql, or postgres
SESSION_TYPE=cookie

# mail settings
SMTP_HOST=
SMTP_USERNAME=
SMTP_PASSWORD=
SMTP_PORT=
SMTP_ENCRYPTION=
SMTP_FROM=
MAIL_DOMAIN=
FROM_NAME=
FROM_ADDRESS=

# template engine: go or jet
RENDERER=jet

# the encryption key; 32 characters or longer
KEY=${KEY}
"#;

/// Rendered into the module descriptor (`go.mod`)
pub const MODULE_TEMPLATE: &str = r#"module ${MODULE_PATH}

go 1.21
"#;
