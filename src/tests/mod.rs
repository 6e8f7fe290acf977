mod fake_obs;
