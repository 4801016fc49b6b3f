// Shared environment fixtures for the integration tests
#![allow(dead_code)]

use std::env;
use std::path::Path;

/// Every variable the AWS provider chain consults for credentials.
const AWS_VARS: &[&str] = &[
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_SESSION_TOKEN",
    "AWS_PROFILE",
    "AWS_DEFAULT_PROFILE",
    "AWS_SHARED_CREDENTIALS_FILE",
    "AWS_CONFIG_FILE",
    "AWS_WEB_IDENTITY_TOKEN_FILE",
    "AWS_ROLE_ARN",
    "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI",
    "AWS_CONTAINER_CREDENTIALS_FULL_URI",
    "AWS_EC2_METADATA_DISABLED",
];

/// Points the credential chain at `dir/credentials` and `dir/config` and
/// turns off instance metadata, so only files a test writes there count.
pub fn isolate_aws_env(dir: &Path) {
    clear_aws_env();
    env::set_var("AWS_SHARED_CREDENTIALS_FILE", dir.join("credentials"));
    env::set_var("AWS_CONFIG_FILE", dir.join("config"));
    env::set_var("AWS_EC2_METADATA_DISABLED", "true");
}

pub fn clear_aws_env() {
    for var in AWS_VARS {
        env::remove_var(var);
    }
}
