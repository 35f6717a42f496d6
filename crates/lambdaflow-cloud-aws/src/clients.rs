//! AWS SDK clients for one region

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// SDK clients sharing one loaded configuration
#[derive(Clone, Debug)]
pub struct AwsClients {
    pub region: String,
    pub lambda: aws_sdk_lambda::Client,
    pub apigateway: aws_sdk_apigatewayv2::Client,
    pub sns: aws_sdk_sns::Client,
    pub s3: aws_sdk_s3::Client,
    pub sts: aws_sdk_sts::Client,
}

impl AwsClients {
    /// Load credentials from the standard AWS chain.
    ///
    /// `None` leaves region resolution to the SDK (`AWS_REGION`, profile).
    pub async fn load(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;
        let region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_default();
        Self::from_config(region, &config)
    }

    pub fn from_config(region: impl Into<String>, config: &SdkConfig) -> Self {
        Self {
            region: region.into(),
            lambda: aws_sdk_lambda::Client::new(config),
            apigateway: aws_sdk_apigatewayv2::Client::new(config),
            sns: aws_sdk_sns::Client::new(config),
            s3: aws_sdk_s3::Client::new(config),
            sts: aws_sdk_sts::Client::new(config),
        }
    }
}
