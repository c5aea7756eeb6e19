//! 用户注册与登录

use std::sync::Arc;

use domain::{NewUser, RepositoryError, User, UserRepository};

use crate::error::ApplicationError;
use crate::password::PasswordHasher;

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticateUserRequest {
    pub email: String,
    pub password: String,
}

pub struct UserServiceDependencies {
    pub users: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self {
            users: deps.users,
            password_hasher: deps.password_hasher,
        }
    }

    /// 注册新用户。邮箱冲突映射为资源已存在错误（HTTP 409）。
    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, ApplicationError> {
        User::validate_registration(&request.name, &request.email, &request.password)?;

        let password_hash = self.password_hasher.hash(&request.password).await?;
        let user = self
            .users
            .create(NewUser {
                name: request.name,
                email: request.email.clone(),
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepositoryError::Conflict => ApplicationError::Domain(
                    domain::DomainError::resource_already_exists("user", request.email),
                ),
                other => ApplicationError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// 校验登录凭证。未知邮箱与错误密码返回同一个错误，
    /// 不向调用方泄露账号是否存在。
    pub async fn authenticate(
        &self,
        request: AuthenticateUserRequest,
    ) -> Result<User, ApplicationError> {
        let Some(user) = self.users.find_by_email(&request.email).await? else {
            return Err(ApplicationError::Authentication);
        };

        let valid = self
            .password_hasher
            .verify(&request.password, &user.password_hash)
            .await?;
        if !valid {
            return Err(ApplicationError::Authentication);
        }

        Ok(user)
    }
}
