use super::api::{ApiRequest, Transport, call, unwrap_data};
use crate::{
  entity::coupon::{
    self, DataList, NewPromotionCoupon, NewUserCoupon, UserOption,
  },
  prelude::*,
};

pub struct Coupon<'a> {
  api: &'a dyn Transport,
}

impl<'a> Coupon<'a> {
  pub fn new(api: &'a dyn Transport) -> Self {
    Self { api }
  }

  pub async fn all(&self) -> Result<Vec<coupon::Model>> {
    let list: DataList<coupon::Model> =
      call(self.api, ApiRequest::get("/coupon/getAllCoupons")).await?;
    Ok(list.data)
  }

  pub async fn create_promotion(
    &self,
    coupon: &NewPromotionCoupon,
  ) -> Result<coupon::Model> {
    let request =
      ApiRequest::post("/coupon/createCouponForPromotion").json(coupon)?;
    self.created(request).await
  }

  pub async fn create_for_user(
    &self,
    coupon: &NewUserCoupon,
  ) -> Result<coupon::Model> {
    let request = ApiRequest::post("/coupon/particularUser").json(coupon)?;
    self.created(request).await
  }

  async fn created(&self, request: ApiRequest) -> Result<coupon::Model> {
    let value = unwrap_data(self.api.request(request).await?);
    Ok(json::from_value(value)?)
  }

  pub async fn delete(&self, coupon_id: &str) -> Result<()> {
    self
      .api
      .request(ApiRequest::delete(format!("/coupon/deleteCoupon/{coupon_id}")))
      .await?;
    Ok(())
  }

  /// Users whose name or email matches `query`.
  pub async fn search_users(&self, query: &str) -> Result<Vec<UserOption>> {
    let list: DataList<UserOption> = call(
      self.api,
      ApiRequest::get("/user/searchUsers").query("query", query),
    )
    .await?;
    Ok(list.data)
  }
}
