//! Inline report and log documents shared by unit and integration tests.

/// One failed Selenium wait, plus a passed test and a configuration method.
pub const TESTNG_TIMEOUT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testng-results skipped="0" failed="1" total="2" passed="1">
  <suite name="Regression" duration-ms="31000">
    <test name="Login">
      <class name="com.acme.tests.LoginTest">
        <test-method status="PASS" signature="setUp()" name="setUp" is-config="true" duration-ms="12" started-at="2024-03-01T10:00:00Z"/>
        <test-method status="PASS" name="testLogout" duration-ms="950" started-at="2024-03-01T10:00:01Z"/>
        <test-method status="FAIL" name="testLogin" duration-ms="30012" started-at="2024-03-01T10:00:02Z">
          <exception class="org.openqa.selenium.TimeoutException">
            <message><![CDATA[Timeout waiting for element #submit after 30 seconds]]></message>
            <full-stacktrace><![CDATA[org.openqa.selenium.TimeoutException: Timeout waiting for element #submit after 30 seconds
	at org.openqa.selenium.support.ui.WebDriverWait.timeoutException(WebDriverWait.java:95)
	at com.acme.pages.LoginPage.submit(LoginPage.java:42)
	at com.acme.tests.LoginTest.testLogin(LoginTest.java:27)]]></full-stacktrace>
          </exception>
        </test-method>
      </class>
    </test>
  </suite>
</testng-results>
"#;

/// An HTTP 500 surfaced through a TestNG assertion.
pub const TESTNG_SERVER_ERROR: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testng-results>
  <suite name="Checkout">
    <test name="Orders">
      <class name="com.acme.checkout.CheckoutTest">
        <test-method status="FAIL" name="testPlaceOrder" duration-ms="1840" started-at="2024-03-01T11:00:00Z">
          <exception class="java.lang.AssertionError">
            <message><![CDATA[expected [200] but found [500]: 500 Internal Server Error]]></message>
            <full-stacktrace><![CDATA[java.lang.AssertionError: expected [200] but found [500]: 500 Internal Server Error
	at org.testng.Assert.fail(Assert.java:110)
	at com.acme.checkout.CheckoutTest.testPlaceOrder(CheckoutTest.java:57)]]></full-stacktrace>
          </exception>
        </test-method>
      </class>
    </test>
  </suite>
</testng-results>
"#;

/// The same checkout test, passing.
pub const TESTNG_SERVER_ERROR_PASSING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testng-results>
  <suite name="Checkout">
    <test name="Orders">
      <class name="com.acme.checkout.CheckoutTest">
        <test-method status="PASS" name="testPlaceOrder" duration-ms="1210" started-at="2024-03-02T11:00:00Z"/>
      </class>
    </test>
  </suite>
</testng-results>
"#;

/// JUnit XML with one failure, one error and one skip.
pub const JUNIT_MIXED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuites>
  <testsuite name="api" tests="4" failures="1" errors="1" skipped="1">
    <testcase classname="com.acme.api.UserApiTest" name="createsUser" time="0.412"/>
    <testcase classname="com.acme.api.UserApiTest" name="rejectsDuplicate" time="0.120">
      <failure message="expected:&lt;409&gt; but was:&lt;201&gt;" type="java.lang.AssertionError">java.lang.AssertionError: expected:&lt;409&gt; but was:&lt;201&gt;
	at com.acme.api.UserApiTest.rejectsDuplicate(UserApiTest.java:88)</failure>
    </testcase>
    <testcase classname="com.acme.api.UserApiTest" name="listsUsers" time="5.002">
      <error message="Connection refused: localhost/127.0.0.1:8080" type="java.net.ConnectException">java.net.ConnectException: Connection refused
	at com.acme.api.UserApiTest.listsUsers(UserApiTest.java:40)</error>
    </testcase>
    <testcase classname="com.acme.api.UserApiTest" name="deletesUser">
      <skipped/>
    </testcase>
  </testsuite>
</testsuites>
"#;

/// TestNG's human-readable report, which is not a parser input.
pub const HTML_REPORT: &str = r#"<!DOCTYPE html>
<html>
<head><title>TestNG Report</title></head>
<body><table><tr><td>testLogin</td><td>FAIL</td></tr></table></body>
</html>
"#;

/// Automation log for the login timeout.
pub const SELENIUM_LOG: &str = "\
2024-03-01 10:00:02,001 INFO [main] com.acme.tests.LoginTest - starting testLogin
2024-03-01 10:00:32,010 ERROR [main] com.acme.tests.LoginTest - Timeout waiting for element #submit
\tat org.openqa.selenium.support.ui.WebDriverWait.timeoutException(WebDriverWait.java:95)
\tat com.acme.pages.LoginPage.submit(LoginPage.java:42)
[WARN] 10:00:33 Reporter - screenshot skipped
";

/// Automation log for the checkout failure.
pub const CHECKOUT_LOG: &str = "\
2024-03-01 11:00:00,100 INFO [main] com.acme.checkout.CheckoutTest - placing order
2024-03-01 11:00:01,900 ERROR [main] com.acme.checkout.CheckoutTest - Order submission failed: 500 Internal Server Error
\tat com.acme.checkout.CheckoutTest.testPlaceOrder(CheckoutTest.java:57)
";

/// Application-under-test log with a server-side error.
pub const APP_LOG: &str = "\
2024-03-01 11:00:01,850 ERROR [http-nio-8080-exec-3] com.acme.orders.OrderService - Failed to persist order
\tat com.acme.orders.OrderRepository.save(OrderRepository.java:77)
";
